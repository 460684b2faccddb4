use clap::Parser;
use rtsp::{Connection, ErrorKind, Frame, SessionListener};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "rtsp-play",
    about = "Play an RTSP stream for a while and report what arrived"
)]
struct Args {
    /// Server host name or IP address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server RTSP port
    #[arg(long, short, default_value_t = 554)]
    port: u16,

    /// Stream to set up (e.g. movie.Mjpeg)
    #[arg(long, short)]
    stream: String,

    /// Seconds to stay in PLAY before pausing
    #[arg(long, short, default_value_t = 10)]
    duration: u64,
}

/// Counts frames and bytes; logs errors reported by the connection.
#[derive(Default)]
struct FrameCounter {
    frames: AtomicU64,
    bytes: AtomicU64,
}

impl SessionListener for FrameCounter {
    fn deliver_frame(&self, frame: Frame) {
        self.frames.fetch_add(1, Ordering::Relaxed);
        self.bytes
            .fetch_add(frame.payload.len() as u64, Ordering::Relaxed);
        tracing::debug!(
            seq = frame.sequence(),
            ts = frame.rtp_timestamp(),
            pt = frame.payload_type,
            len = frame.payload.len(),
            "frame"
        );
    }

    fn report_error(&self, kind: ErrorKind, message: &str) {
        tracing::error!(%kind, detail = message, "session error");
    }
}

fn run(args: &Args, counter: Arc<FrameCounter>) -> rtsp::Result<()> {
    let connection = Connection::connect(counter, &args.host, args.port)?;

    connection.setup(&args.stream)?;
    connection.play()?;
    thread::sleep(Duration::from_secs(args.duration));
    connection.pause()?;
    connection.teardown()?;
    connection.close();
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let counter = Arc::new(FrameCounter::default());

    let result = run(&args, counter.clone());

    println!(
        "received {} frames ({} payload bytes)",
        counter.frames.load(Ordering::Relaxed),
        counter.bytes.load(Ordering::Relaxed)
    );

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", args.stream, e);
            ExitCode::FAILURE
        }
    }
}
