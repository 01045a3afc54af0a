use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use crate::cmd::simulate::SimulationReport;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

pub fn print_report(report: &SimulationReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(report).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PEER", "SENT", "STRAY", "DELIVERED", "REPLIES"]);
            for peer in &report.peers {
                table.add_row(vec![
                    peer.peer.clone(),
                    peer.sent.to_string(),
                    peer.stray.to_string(),
                    peer.delivered.to_string(),
                    peer.replies.to_string(),
                ]);
            }
            println!("{table}");
            println!("{}", summary_line(report));
        }
        OutputFormat::Pretty => {
            for peer in &report.peers {
                println!(
                    "peer={} sent={} stray={} delivered={} replies={}",
                    peer.peer, peer.sent, peer.stray, peer.delivered, peer.replies
                );
            }
            println!("{}", summary_line(report));
        }
    }
}

fn summary_line(report: &SimulationReport) -> String {
    format!(
        "socket={} delivered={}/{} replies={} discarded={}/{} pipes_remaining={}",
        report.socket_type,
        report.delivered,
        report.expected,
        report.replies_sent,
        report.discarded_frames,
        report.expected_discards,
        report.pipes_remaining
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::simulate::PeerReport;

    #[test]
    fn summary_reports_totals() {
        let report = SimulationReport {
            socket_type: "CLIENT".to_string(),
            peers: vec![PeerReport {
                peer: "peer-0".to_string(),
                sent: 2,
                stray: 1,
                delivered: 2,
                replies: 2,
            }],
            expected: 2,
            delivered: 2,
            replies_sent: 2,
            discarded_frames: 3,
            expected_discards: 3,
            pipes_remaining: 0,
        };
        assert_eq!(
            summary_line(&report),
            "socket=CLIENT delivered=2/2 replies=2 discarded=3/3 pipes_remaining=0"
        );
        assert!(report.is_clean());
    }
}
