//! Integration tests for the controller side against a simulated peripheral

use led_matrix_link::colors::{self, BLACK, BLUE, RED};
use led_matrix_link::host::{
    Controller, ControllerError, HostCommand, Loopback, MasterLink, Reply,
};
use led_matrix_link::{ACK, NACK_HEAD, ProtocolState};

type Sim = Loopback<10, 6>;

/// Link that corrupts the complement byte of the next transfers.
struct CorruptingLink {
    inner: Sim,
    corrupt_next: usize,
}

impl MasterLink for CorruptingLink {
    type Error = core::convert::Infallible;

    fn transfer(&mut self, tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error> {
        if self.corrupt_next > 0 {
            self.corrupt_next -= 1;
            let mut bad = tx.to_vec();
            bad[1] ^= 0x01;
            self.inner.transfer(&bad, rx)
        } else {
            self.inner.transfer(tx, rx)
        }
    }
}

/// Link that answers ACK to every byte, echoes included.
struct AckEverythingLink;

impl MasterLink for AckEverythingLink {
    type Error = core::convert::Infallible;

    fn transfer(&mut self, _tx: &[u8], rx: &mut [u8]) -> Result<(), Self::Error> {
        rx.fill(ACK);
        Ok(())
    }
}

/// Link that always fails.
struct BrokenLink;

#[derive(Debug, PartialEq)]
struct LinkDown;

impl MasterLink for BrokenLink {
    type Error = LinkDown;

    fn transfer(&mut self, _tx: &[u8], _rx: &mut [u8]) -> Result<(), Self::Error> {
        Err(LinkDown)
    }
}

#[test]
fn controller_drives_simulated_peripheral() {
    let mut controller = Controller::new(Sim::new());

    controller.send(&HostCommand::Fill(BLUE)).unwrap();
    controller
        .send(&HostCommand::SetPixel { x: 9, y: 5, color: RED })
        .unwrap();
    controller.send(&HostCommand::Update).unwrap();

    let sim = controller.link();
    assert_eq!(sim.flushes(), 1);
    assert_eq!(sim.engine().framebuffer().pixel(9, 5), Some(RED));
    assert_eq!(sim.engine().framebuffer().pixel(0, 0), Some(BLUE));
    assert_eq!(sim.engine().state(), ProtocolState::AwaitingCommand);
}

#[test]
fn exchange_carries_expected_replies_shifted_by_one() {
    let mut controller = Controller::new(Sim::new());
    controller.send(&HostCommand::SmallEmpty).unwrap();

    let command = HostCommand::Fill(colors::from_bytes([0x10, 0x20, 0x30]));
    let exchange = controller.send(&command).unwrap();

    assert_eq!(exchange.tx, command.encode());
    // First byte clocked in is the previous command's ACK
    assert_eq!(exchange.rx[0], ACK);
    assert_eq!(&exchange.rx[1..], command.expected_replies().as_slice());
    assert_eq!(exchange.reply(), Reply::Ack);
}

#[test]
fn rejected_command_reports_reply_and_bytes() {
    let link = CorruptingLink {
        inner: Sim::new(),
        corrupt_next: 1,
    };
    let mut controller = Controller::new(link);

    match controller.send(&HostCommand::Clear) {
        Err(ControllerError::Rejected { reply, exchange }) => {
            assert_eq!(exchange.tx.as_slice(), [0x01, 0xFE, 0x00, 0x00]);
            assert_eq!(exchange.rx[2], NACK_HEAD);
            assert_eq!(reply, Reply::NackHead);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn final_ack_without_echo_sequence_is_rejected() {
    let mut controller = Controller::new(AckEverythingLink);

    match controller.send(&HostCommand::SetPixel { x: 1, y: 2, color: RED }) {
        Err(ControllerError::Rejected { reply, exchange }) => {
            // The code echo (1) is the first response that goes wrong
            assert_eq!(reply, Reply::Ack);
            assert_eq!(exchange.reply(), Reply::Ack);
            assert_eq!(exchange.rx.as_slice(), [ACK; 8]);
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[test]
fn send_retrying_resends_from_code_byte() {
    let link = CorruptingLink {
        inner: Sim::new(),
        corrupt_next: 2,
    };
    let mut controller = Controller::new(link);

    let exchange = controller
        .send_retrying(&HostCommand::Fill(RED), 3)
        .unwrap();
    assert_eq!(exchange.reply(), Reply::Ack);
    assert_eq!(
        controller.link().inner.engine().framebuffer().pixel(0, 0),
        Some(RED)
    );
}

#[test]
fn send_retrying_gives_up_after_attempts() {
    let link = CorruptingLink {
        inner: Sim::new(),
        corrupt_next: 5,
    };
    let mut controller = Controller::new(link);

    let result = controller.send_retrying(&HostCommand::Clear, 2);
    assert!(matches!(result, Err(ControllerError::Rejected { .. })));
    assert_eq!(controller.into_inner().corrupt_next, 3);
}

#[test]
fn link_failure_is_not_retried() {
    let mut controller = Controller::new(BrokenLink);
    let result = controller.send_retrying(&HostCommand::Update, 4);
    assert_eq!(result, Err(ControllerError::Link(LinkDown)));
}

#[test]
fn stalled_link_recovers_on_resend() {
    let mut controller = Controller::new(Sim::new());

    // Half a SetPixel goes out, then the link stalls
    let mut rx = [0u8; 4];
    controller
        .link_mut()
        .transfer(&[0x04, 0xFB, 1, 1], &mut rx)
        .unwrap();
    controller.link_mut().stall();

    let exchange = controller
        .send(&HostCommand::SetPixel { x: 1, y: 1, color: RED })
        .unwrap();
    assert_eq!(exchange.rx[0], led_matrix_link::TIMEOUT);
    assert_eq!(
        controller.link().engine().framebuffer().pixel(1, 1),
        Some(RED)
    );
    assert_eq!(
        controller.link().engine().framebuffer().pixel(0, 0),
        Some(BLACK)
    );
}
