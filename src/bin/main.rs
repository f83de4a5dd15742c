use std::io::Write;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gillstream::{
    parse_one_file, GillError, GillStream, Message, Query, RecordType, StreamConfig, StreamStats,
};
use log::info;

/// gillstream streams BGP messages from GILL MRT archives.
#[derive(Parser, Debug)]
#[clap(name = "gillstream", version)]
struct Opts {
    #[clap(subcommand)]
    command: Command,

    #[clap(flatten)]
    output: OutputOpts,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query the broker and stream every message in the time window
    Stream {
        /// Start of the window: unix timestamp or 'YYYY-MM-DD HH:MM:SS' (local time)
        #[clap(short, long)]
        from: String,

        /// End of the window, inclusive: unix timestamp or 'YYYY-MM-DD HH:MM:SS' (local time)
        #[clap(short, long)]
        until: String,

        /// Record type: updates or ribs
        #[clap(short = 't', long, default_value = "updates", value_parser = parse_record_type)]
        record_type: RecordType,

        /// Vantage point as ASN_IP, e.g. 3130_147.28.0.3. Repeat for several; all when omitted
        #[clap(short, long)]
        peer: Vec<String>,

        /// Broker endpoint. Defaults to GILLSTREAM_BROKER_URL or the bgproutes.io broker
        #[clap(long)]
        broker_url: Option<String>,

        /// Directory for downloaded files. Defaults to GILLSTREAM_TMP_DIR or /tmp/gillstream
        #[clap(long)]
        tmp_dir: Option<PathBuf>,
    },
    /// Decode a single local MRT file, plain or compressed
    File {
        /// File path to a MRT file
        #[clap(name = "FILE")]
        file_path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct OutputOpts {
    /// Output as JSON objects
    #[clap(long, global = true)]
    json: bool,

    /// Pretty-print JSON output
    #[clap(long, global = true)]
    pretty: bool,

    /// Only print the number of messages
    #[clap(short, long, global = true)]
    count: bool,

    /// Print the pipe-separated header line first
    #[clap(long, global = true)]
    psv_header: bool,
}

fn parse_record_type(s: &str) -> Result<RecordType, String> {
    s.parse::<RecordType>().map_err(|e| e.to_string())
}

fn main() {
    let opts: Opts = Opts::parse();

    env_logger::init();

    if let Err(e) = run(opts) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(opts: Opts) -> Result<(), GillError> {
    match opts.command {
        Command::Stream {
            from,
            until,
            record_type,
            peer,
            broker_url,
            tmp_dir,
        } => {
            let vantage_points = match peer.is_empty() {
                true => None,
                false => Some(peer),
            };
            let query = Query::new(from, until, record_type, vantage_points)?;

            let mut config = StreamConfig::from_env();
            if let Some(url) = broker_url {
                config = config.with_broker_url(url);
            }
            if let Some(dir) = tmp_dir {
                config = config.with_tmp_dir(dir);
            }

            let mut stream = GillStream::with_config(query, config)?;
            info!("{} files to process", stream.all_files().len());
            output(&mut stream, &opts.output);
            log_stats(stream.stats());
        }
        Command::File { file_path } => {
            let mut stream = parse_one_file(&file_path)?;
            output(&mut stream, &opts.output);
            log_stats(stream.stats());
        }
    }
    Ok(())
}

fn output(messages: &mut dyn Iterator<Item = Message>, opts: &OutputOpts) {
    if opts.count {
        println!("total messages: {}", messages.count());
        return;
    }

    let mut stdout = std::io::stdout();
    if opts.psv_header && !opts.json {
        println!("{}", Message::get_psv_header());
    }
    for msg in messages {
        let output_str = if opts.json {
            let res = match opts.pretty {
                true => serde_json::to_string_pretty(&msg),
                false => serde_json::to_string(&msg),
            };
            match res {
                Ok(s) => s,
                Err(e) => {
                    eprintln!("{}", e);
                    continue;
                }
            }
        } else {
            msg.to_string()
        };
        if let Err(e) = writeln!(stdout, "{}", &output_str) {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                eprintln!("{}", e);
            }
            std::process::exit(1);
        }
    }
}

fn log_stats(stats: &StreamStats) {
    info!(
        "files: {} total, {} opened, {} skipped, {} unreadable; entries: {} read, {} out of window, {} discarded; {} messages",
        stats.files_total,
        stats.files_opened,
        stats.files_skipped,
        stats.files_unreadable,
        stats.entries_read,
        stats.entries_out_of_window,
        stats.entries_discarded,
        stats.messages_emitted
    );
}
