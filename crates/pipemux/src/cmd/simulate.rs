use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use pipemux_frame::Frame;
use pipemux_pipe::{pair, Credential, InprocPipe, Pipe, PipeConfig, PipeError};
use pipemux_socket::{ClientSocket, SocketContext, SocketError, SocketPattern};
use serde::Serialize;

use crate::cmd::{parse_duration, SimulateArgs};
use crate::exit::{socket_error, CliError, CliResult, FAILURE, INTERNAL, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_report, OutputFormat};

const EVENT_POLL: Duration = Duration::from_millis(20);
const PEER_BACKOFF: Duration = Duration::from_millis(1);
/// Frames in each stray message a peer injects.
const STRAY_FRAMES: usize = 3;

#[derive(Debug, Serialize)]
pub struct PeerReport {
    pub peer: String,
    pub sent: usize,
    pub stray: usize,
    pub delivered: usize,
    pub replies: usize,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub socket_type: String,
    pub peers: Vec<PeerReport>,
    pub expected: usize,
    pub delivered: usize,
    pub replies_sent: usize,
    pub discarded_frames: u64,
    pub expected_discards: u64,
    pub pipes_remaining: usize,
}

impl SimulationReport {
    pub fn is_clean(&self) -> bool {
        self.delivered == self.expected
            && self.discarded_frames == self.expected_discards
            && self.pipes_remaining == 0
    }
}

struct PeerOutcome {
    name: String,
    sent: usize,
    stray: usize,
    replies: usize,
}

pub fn run(args: SimulateArgs, format: OutputFormat) -> CliResult<i32> {
    if args.peers == 0 {
        return Err(CliError::new(USAGE, "--peers must be at least 1"));
    }
    let deadline = Instant::now() + parse_duration(&args.timeout)?;

    let mut socket = ClientSocket::new(SocketContext {
        context_id: 1,
        thread_id: 0,
        socket_id: 1,
    });
    let (mailbox_tx, mailbox) = mpsc::channel();
    let done = Arc::new(AtomicBool::new(false));

    let mut endpoints = Vec::with_capacity(args.peers);
    let mut workers = Vec::with_capacity(args.peers);
    for index in 0..args.peers {
        let name = format!("peer-{index}");
        let (ours, theirs) = pair(PipeConfig {
            hwm: args.hwm,
            left_credential: Credential::new(name.clone()),
            ..PipeConfig::default()
        });
        let ours = Arc::new(ours);
        let handle: Arc<dyn Pipe> = ours.clone();
        socket.attach(&handle);
        ours.set_notifier(mailbox_tx.clone());
        endpoints.push(ours);

        let script = peer_script(&name, args.messages, args.stray);
        workers.push(spawn_peer(name, theirs, script, deadline, Arc::clone(&done)));
    }
    drop(mailbox_tx);

    tracing::info!(
        peers = args.peers,
        messages = args.messages,
        stray = args.stray,
        hwm = args.hwm,
        "simulation started"
    );

    let expected = args.peers * args.messages;
    let mut delivered: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0usize;
    let mut replies: VecDeque<Frame> = VecDeque::new();
    let mut replies_sent = 0usize;

    while total < expected || !replies.is_empty() {
        if Instant::now() >= deadline {
            done.store(true, Ordering::SeqCst);
            join_peers(workers)?;
            return Err(CliError::new(
                TIMEOUT,
                format!(
                    "simulation timed out: {total}/{expected} delivered, {} replies pending",
                    replies.len()
                ),
            ));
        }

        match mailbox.recv_timeout(EVENT_POLL) {
            Ok(event) => socket.process_event(event),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                return Err(CliError::new(INTERNAL, "pipe mailbox disconnected"));
            }
        }
        socket.process_events(&mailbox);

        loop {
            match socket.recv() {
                Ok(frame) => {
                    let peer = String::from_utf8_lossy(socket.credential().as_bytes()).into_owned();
                    *delivered.entry(peer).or_default() += 1;
                    total += 1;
                    replies.push_back(Frame::new(frame.payload));
                }
                Err(SocketError::WouldBlock) => break,
                Err(err) => return Err(socket_error("recv failed", err)),
            }
        }
        replies_sent += flush_replies(&mut socket, &mut replies)?;
    }

    done.store(true, Ordering::SeqCst);
    let outcomes = join_peers(workers)?;

    for endpoint in &endpoints {
        endpoint.terminate();
    }
    socket.process_events(&mailbox);

    let stray_total: usize = outcomes.iter().map(|o| o.stray).sum();
    let report = SimulationReport {
        socket_type: socket.socket_type().to_string(),
        peers: outcomes
            .into_iter()
            .map(|o| PeerReport {
                delivered: delivered.get(&o.name).copied().unwrap_or(0),
                peer: o.name,
                sent: o.sent,
                stray: o.stray,
                replies: o.replies,
            })
            .collect(),
        expected,
        delivered: total,
        replies_sent,
        discarded_frames: socket.discarded_frames(),
        expected_discards: (stray_total * STRAY_FRAMES) as u64,
        pipes_remaining: socket.pipe_count(),
    };

    tracing::info!(
        delivered = report.delivered,
        discarded = report.discarded_frames,
        "simulation finished"
    );
    print_report(&report, format);

    if report.is_clean() {
        Ok(SUCCESS)
    } else {
        Ok(FAILURE)
    }
}

/// Clean messages interleaved with evenly spread stray multi-frame messages.
fn peer_script(name: &str, messages: usize, stray: usize) -> VecDeque<Frame> {
    let every = if stray == 0 {
        usize::MAX
    } else {
        (messages / stray).max(1)
    };

    let mut script = VecDeque::new();
    let mut stray_left = stray;
    let push_stray = |script: &mut VecDeque<Frame>, k: usize| {
        let parts = (0..STRAY_FRAMES).map(|part| format!("{name}:stray-{k}:{part}"));
        script.extend(Frame::sequence(parts));
    };

    for seq in 0..messages {
        if stray_left > 0 && seq % every == 0 {
            push_stray(&mut script, stray - stray_left);
            stray_left -= 1;
        }
        script.push_back(Frame::new(format!("{name}:{seq}")));
    }
    while stray_left > 0 {
        push_stray(&mut script, stray - stray_left);
        stray_left -= 1;
    }
    script
}

fn spawn_peer(
    name: String,
    pipe: InprocPipe,
    mut script: VecDeque<Frame>,
    deadline: Instant,
    done: Arc<AtomicBool>,
) -> JoinHandle<PeerOutcome> {
    thread::spawn(move || {
        let mut outcome = PeerOutcome {
            name,
            sent: 0,
            stray: 0,
            replies: 0,
        };
        let mut in_stray = false;

        while let Some(frame) = script.pop_front() {
            let more = frame.more;
            match pipe.write(frame) {
                Ok(()) => {
                    if more {
                        in_stray = true;
                    } else if in_stray {
                        in_stray = false;
                        outcome.stray += 1;
                    } else {
                        outcome.sent += 1;
                    }
                }
                Err(PipeError::Full { frame }) => {
                    script.push_front(frame);
                    if Instant::now() >= deadline {
                        break;
                    }
                    outcome.replies += drain(&pipe);
                    thread::sleep(PEER_BACKOFF);
                }
                Err(PipeError::Closed { .. }) => break,
            }
        }
        tracing::debug!(peer = %outcome.name, sent = outcome.sent, stray = outcome.stray, "peer finished sending");

        while !done.load(Ordering::SeqCst) && Instant::now() < deadline {
            outcome.replies += drain(&pipe);
            thread::sleep(PEER_BACKOFF);
        }
        outcome.replies += drain(&pipe);
        outcome
    })
}

fn drain(pipe: &InprocPipe) -> usize {
    std::iter::from_fn(|| pipe.read()).count()
}

fn flush_replies(socket: &mut ClientSocket, replies: &mut VecDeque<Frame>) -> CliResult<usize> {
    let mut sent = 0usize;
    while let Some(frame) = replies.pop_front() {
        match socket.send(frame) {
            Ok(()) => sent += 1,
            Err(err) if err.is_would_block() => {
                replies.push_front(err.into_frame());
                break;
            }
            Err(err) => return Err(socket_error("send failed", err.into())),
        }
    }
    Ok(sent)
}

fn join_peers(workers: Vec<JoinHandle<PeerOutcome>>) -> CliResult<Vec<PeerOutcome>> {
    workers
        .into_iter()
        .map(|worker| {
            worker
                .join()
                .map_err(|_| CliError::new(INTERNAL, "peer thread panicked"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(peers: usize, messages: usize, stray: usize, hwm: usize) -> SimulateArgs {
        SimulateArgs {
            peers,
            messages,
            stray,
            hwm,
            timeout: "10s".to_string(),
        }
    }

    #[test]
    fn script_spreads_stray_messages() {
        let script = peer_script("p", 4, 2);
        let flags: Vec<bool> = script.iter().map(|f| f.more).collect();
        assert_eq!(
            flags,
            vec![true, true, false, false, false, true, true, false, false, false]
        );
        assert_eq!(script.back().unwrap().payload.as_ref(), b"p:3");
    }

    #[test]
    fn script_appends_surplus_stray_messages() {
        let script = peer_script("p", 1, 3);
        assert_eq!(script.len(), 1 + 3 * STRAY_FRAMES);
        assert!(script.back().unwrap().is_last());
    }

    #[test]
    fn script_without_stray_is_clean() {
        let script = peer_script("p", 3, 0);
        assert!(script.iter().all(Frame::is_last));
        assert_eq!(script.len(), 3);
    }

    #[test]
    fn zero_peers_is_usage_error() {
        let err = run(args(0, 1, 0, 1), OutputFormat::Json).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn small_hwm_run_is_clean() {
        let code = run(args(3, 25, 2, 2), OutputFormat::Json).unwrap();
        assert_eq!(code, SUCCESS);
    }
}
