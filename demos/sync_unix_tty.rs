use serialport::TTYPort;
use slcan::slot::Timeout;
use slcan::{BitrateIndex, Channel, Error, OpMode};

fn main() -> std::io::Result<()> {
    env_logger::init();

    let arg = std::env::args().nth(1);

    let Some(filename) = arg else {
        eprintln!("usage: unix_tty <TTY path>");
        std::process::exit(1);
    };

    let port = serialport::TTYPort::open(&serialport::new(filename, 115200))?;
    let channel = Channel::new(Box::new(port));

    channel
        .initialize(OpMode {
            monitor: true,
            ..OpMode::default()
        })
        .expect("failed to initialize channel");
    channel
        .start(BitrateIndex::Index500Kbps)
        .expect("failed to start channel");

    loop {
        match channel.read(Timeout::Infinite) {
            Ok(frame) => println!("{:?}", frame),
            Err(Error::Timeout) | Err(Error::Cancelled) => {}
            Err(e) => eprintln!("{:?}", e),
        }
    }
}
