mod cli;
mod serial;

use anyhow::{Context, Result, bail};
use clap::{ArgMatches, CommandFactory, FromArgMatches};

use cli::Cli;
use led_matrix_link::colors::{self, Pixel};
use led_matrix_link::host::{Controller, ControllerError, Exchange, HostCommand, Loopback, MasterLink};
use led_matrix_link::{Framebuffer, MATRIX_HEIGHT, MATRIX_WIDTH};
use serial::SerialLink;

/// One command-line flag, resolved.
enum Step {
    Send { label: String, command: HostCommand },
    Invalid(String),
}

fn main() -> Result<()> {
    env_logger::init();

    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches)?;
    let steps = collect_steps(&cli, &matches);

    if steps.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    let attempts = cli.retries + 1;

    if cli.loopback {
        let mut controller = Controller::new(Loopback::<MATRIX_WIDTH, MATRIX_HEIGHT>::new());
        let failures = run(&mut controller, &steps, attempts)?;

        let loopback = controller.link();
        print_matrix(loopback.engine().framebuffer());
        println!("LED string writes: {}", loopback.flushes());
        return check_failures(failures);
    }

    let port = cli
        .port
        .as_deref()
        .context("no serial port given (use --port or --loopback)")?;
    let mut controller = Controller::new(SerialLink::open(port, cli.baud)?);
    let failures = run(&mut controller, &steps, attempts)?;
    check_failures(failures)
}

fn check_failures(failures: usize) -> Result<()> {
    if failures > 0 {
        bail!("{failures} command(s) failed");
    }
    Ok(())
}

/// Orders the flags as they appeared on the command line.
fn collect_steps(cli: &Cli, matches: &ArgMatches) -> Vec<Step> {
    let mut indexed: Vec<(usize, Step)> = Vec::new();

    for index in matches.indices_of("clear").into_iter().flatten() {
        indexed.push((
            index,
            Step::Send {
                label: "clear".into(),
                command: HostCommand::Clear,
            },
        ));
    }

    for index in matches.indices_of("update").into_iter().flatten() {
        indexed.push((
            index,
            Step::Send {
                label: "update".into(),
                command: HostCommand::Update,
            },
        ));
    }

    let fill_indices = matches.indices_of("fill").into_iter().flatten();
    for (index, text) in fill_indices.zip(&cli.fill) {
        let step = match parse_fill(text) {
            Some(color) => Step::Send {
                label: format!(
                    "fill r:{:#04x} g:{:#04x} b:{:#04x}",
                    color.red, color.green, color.blue
                ),
                command: HostCommand::Fill(color),
            },
            None => Step::Invalid(format!("fill failed to parse ({text})")),
        };
        indexed.push((index, step));
    }

    let set_indices = matches.indices_of("set_pixel").into_iter().flatten();
    for (index, text) in set_indices.zip(&cli.set_pixel) {
        let step = match parse_set_pixel(text) {
            Some((x, y, color)) => Step::Send {
                label: format!(
                    "set pixel x:{x} y:{y} r:{:#04x} g:{:#04x} b:{:#04x}",
                    color.red, color.green, color.blue
                ),
                command: HostCommand::SetPixel { x, y, color },
            },
            None => Step::Invalid(format!("set pixel failed to parse ({text})")),
        };
        indexed.push((index, step));
    }

    indexed.sort_by_key(|(index, _)| *index);
    indexed.into_iter().map(|(_, step)| step).collect()
}

/// Parses `RR:GG:BB`, each component hex with an optional `0x` prefix.
fn parse_fill(text: &str) -> Option<Pixel> {
    let parts: Vec<&str> = text.split(':').collect();
    let [r, g, b] = parts.as_slice() else {
        return None;
    };
    Some(colors::from_bytes([
        colors::parse_hex_byte(r)?,
        colors::parse_hex_byte(g)?,
        colors::parse_hex_byte(b)?,
    ]))
}

/// Parses `X:Y:RR:GG:BB`: decimal coordinates, hex color.
fn parse_set_pixel(text: &str) -> Option<(u8, u8, Pixel)> {
    let parts: Vec<&str> = text.split(':').collect();
    let [x, y, r, g, b] = parts.as_slice() else {
        return None;
    };
    Some((
        x.parse().ok()?,
        y.parse().ok()?,
        colors::from_bytes([
            colors::parse_hex_byte(r)?,
            colors::parse_hex_byte(g)?,
            colors::parse_hex_byte(b)?,
        ]),
    ))
}

/// Sends every step in order, skipping ones that failed to parse.
///
/// Returns how many steps were skipped or rejected. A link failure stops the run.
fn run<L>(controller: &mut Controller<L>, steps: &[Step], attempts: usize) -> Result<usize>
where
    L: MasterLink,
    L::Error: std::error::Error + Send + Sync + 'static,
{
    let mut failures = 0;
    for step in steps {
        let (label, command) = match step {
            Step::Send { label, command } => (label, command),
            Step::Invalid(message) => {
                eprintln!("{message}");
                failures += 1;
                continue;
            }
        };

        println!("{label}");
        match controller.send_retrying(command, attempts) {
            Ok(exchange) => dump_exchange(&exchange),
            Err(ControllerError::Rejected { reply, exchange }) => {
                dump_exchange(&exchange);
                eprintln!("{label} failed: unexpected {reply} after {attempts} attempt(s)");
                failures += 1;
            }
            Err(ControllerError::Link(err)) => {
                return Err(err).context("can't complete link transaction");
            }
        }
    }
    Ok(failures)
}

fn dump_exchange(exchange: &Exchange) {
    let hex = |bytes: &[u8]| {
        bytes
            .iter()
            .map(|b| format!("{b:#04x}"))
            .collect::<Vec<_>>()
            .join(" ")
    };
    println!("tx: {}", hex(&exchange.tx));
    println!("rx: {}", hex(&exchange.rx));
}

/// Prints the simulated matrix row by row as `rrggbb` cells.
fn print_matrix<const W: usize, const H: usize>(framebuffer: &Framebuffer<W, H>) {
    for y in 0..H {
        let row: Vec<String> = (0..W)
            .filter_map(|x| framebuffer.pixel(x, y))
            .map(|p| format!("{:02x}{:02x}{:02x}", p.red, p.green, p.blue))
            .collect();
        println!("{}", row.join(" "));
    }
}
