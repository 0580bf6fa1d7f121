use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(
    name = "ledctl",
    about = "Send commands to an LED matrix peripheral",
    after_help = "Commands run in the order given, one link transaction each."
)]
pub struct Cli {
    #[arg(short, long, help = "Serial port path")]
    pub port: Option<String>,

    #[arg(short, long, default_value_t = 115_200, help = "Serial baud rate")]
    pub baud: u32,

    #[arg(
        long,
        conflicts_with = "port",
        help = "Drive an in-process simulated peripheral instead of a serial port"
    )]
    pub loopback: bool,

    #[arg(
        short,
        long,
        default_value_t = 0,
        help = "Times to resend a command the peripheral rejects"
    )]
    pub retries: usize,

    #[arg(short = 'c', action = ArgAction::Count, help = "Clear")]
    pub clear: u8,

    #[arg(short = 'u', action = ArgAction::Count, help = "Update (flush to the LED string)")]
    pub update: u8,

    #[arg(
        short = 'f',
        value_name = "0xRR:0xGG:0xBB",
        action = ArgAction::Append,
        help = "Fill"
    )]
    pub fill: Vec<String>,

    #[arg(
        short = 's',
        value_name = "X:Y:0xRR:0xGG:0xBB",
        action = ArgAction::Append,
        help = "Set pixel"
    )]
    pub set_pixel: Vec<String>,
}
