//! The queue worker: this crate's execution engine.
//!
//! The worker is the only agent that advances a queue's GPU timeline. It
//! drains submissions strictly in order, decoding each list's spans
//! against the wire format: fence signals are delivered, encoded waits
//! block the channel, presents return swapchain slots, barriers become
//! ordering fences. Everything else is state the hardware consumes with no
//! CPU-visible side effect.
//!
//! Decode failure is the hardware fault path: the error state latches,
//! the remaining work drains undelivered, and every fence that would have
//! signaled is poisoned instead.

use super::{Job, QueueShared};
use crate::command::{opcode, CmdList, Opcode};

use ::{
    scopeguard::defer_on_unwind,
    std::sync::{
        atomic::{fence as atomic_fence, Ordering},
        mpsc::Receiver,
        Arc,
    },
};

pub(super) fn run(shared: Arc<QueueShared>, receiver: Receiver<Job>) {
    // A panic in the worker must read as a hardware fault, not a wedged
    // channel.
    let panic_shared = shared.clone();
    defer_on_unwind! {
        panic_shared.error.store(true, Ordering::SeqCst);
    }

    loop {
        match receiver.recv() {
            Ok(Job::Execute(list)) => {
                if shared.error.load(Ordering::SeqCst) {
                    discard(&list);
                    continue;
                }
                if let Err(fault) = execute_list(&list) {
                    log::error!("queue fault while executing command list: {}", fault);
                    shared.error.store(true, Ordering::SeqCst);
                    discard(&list);
                }
            }
            Ok(Job::Shutdown) | Err(_) => break,
        }
    }
}

/// Drop a list without executing it, resolving everything that would
/// otherwise wait forever.
fn discard(list: &CmdList) {
    list.poison_fences();
    list.abandon_presents();
}

/// Walk one list's spans and execute each command.
fn execute_list(list: &CmdList) -> Result<(), &'static str> {
    for span in &list.data.spans {
        let mut offset = 0u32;
        while offset < span.len {
            let header = unsafe { span.block.read_u32(span.offset + offset) };
            let (op_byte, payload_words) = opcode::split_header(header);
            let payload_bytes = 4 * payload_words as u32;
            if offset + 4 + payload_bytes > span.len {
                return Err("command overruns its span");
            }
            let op = match Opcode::from_u8(op_byte) {
                Some(op) => op,
                None => return Err("unknown opcode"),
            };
            let payload = span.offset + offset + 4;
            execute_command(list, op, payload_words, payload, span)?;
            offset += 4 + payload_bytes;
        }
    }
    Ok(())
}

fn execute_command(
    list: &CmdList,
    op: Opcode,
    payload_words: usize,
    payload: u32,
    span: &crate::command::CmdSpan,
) -> Result<(), &'static str> {
    let word = |index: u32| -> u32 { unsafe { span.block.read_u32(payload + 4 * index) } };

    match op {
        Opcode::SignalFence => {
            if payload_words < 2 {
                return Err("malformed fence signal");
            }
            let fence = list
                .data
                .fences
                .get(word(0) as usize)
                .ok_or("fence slot out of range")?;
            fence.signal();
        }
        Opcode::WaitFence => {
            if payload_words < 1 {
                return Err("malformed fence wait");
            }
            let fence = list
                .data
                .fences
                .get(word(0) as usize)
                .ok_or("fence slot out of range")?;
            if !fence.wait_gpu() {
                return Err("encoded wait on a poisoned fence");
            }
        }
        Opcode::Barrier => {
            // The channel executes sequentially; what the barrier adds is
            // cross-thread visibility of everything written so far.
            atomic_fence(Ordering::SeqCst);
        }
        Opcode::PresentImage => {
            if payload_words < 2 {
                return Err("malformed present");
            }
            let swapchain = list
                .data
                .swapchains
                .get(word(0) as usize)
                .ok_or("swapchain slot out of range")?;
            swapchain.complete_present(word(1) as usize);
        }
        // State, draw, dispatch, and transfer commands are consumed by the
        // hardware units; they have no CPU-visible effect to model here.
        _ => {}
    }
    Ok(())
}
