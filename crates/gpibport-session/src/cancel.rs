use std::io;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use gpibport_instrument::Instrument;

use crate::device::Device;

/// How long the watcher waits for an in-flight instrument call before
/// aborting the driver session.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(200);

/// Start the thread that reacts to external cancellation.
///
/// On the first event from `events` the watcher cancels `device` (see
/// [`Device::cancel`]) and calls `on_cancel`; the CLI exits the process
/// there. A read blocked on a silent instrument delays this by at most
/// `grace`. If every sender is dropped first, the watcher returns without
/// touching the device.
pub fn spawn_watcher<I, F>(
    device: Device<I>,
    events: Receiver<()>,
    grace: Duration,
    on_cancel: F,
) -> io::Result<JoinHandle<()>>
where
    I: Instrument + 'static,
    F: FnOnce() + Send + 'static,
{
    thread::Builder::new()
        .name("gpibport-cancel".to_string())
        .spawn(move || {
            if events.recv().is_err() {
                return;
            }
            tracing::info!("cancellation requested, closing instrument");
            if !device.cancel(grace) {
                tracing::debug!("no instrument session was closed");
            }
            on_cancel();
        })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{mpsc, Arc};
    use std::time::Instant;

    use super::*;
    use crate::testing::{ScriptedInstrument, StallingInstrument};

    #[test]
    fn event_closes_device_and_runs_callback() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let device = Device::new(inst);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let (tx, rx) = mpsc::channel();

        let handle = spawn_watcher(device.clone(), rx, DEFAULT_CANCEL_GRACE, move || {
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
        tx.send(()).unwrap();
        handle.join().unwrap();

        assert!(cancelled.load(Ordering::SeqCst));
        assert!(!device.is_open());
        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[test]
    fn dropped_sender_leaves_device_open() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let device = Device::new(inst);
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let (tx, rx) = mpsc::channel::<()>();

        let handle = spawn_watcher(device.clone(), rx, DEFAULT_CANCEL_GRACE, move || {
            flag.store(true, Ordering::SeqCst);
        })
        .unwrap();
        drop(tx);
        handle.join().unwrap();

        assert!(!cancelled.load(Ordering::SeqCst));
        assert!(device.is_open());
        assert_eq!(log.lock().unwrap().closes, 0);
    }

    #[test]
    fn cancellation_after_shutdown_is_harmless() {
        let (inst, log) = ScriptedInstrument::new(Vec::new());
        let device = Device::new(inst);
        let (tx, rx) = mpsc::channel();

        assert!(device.close());
        let handle = spawn_watcher(device.clone(), rx, DEFAULT_CANCEL_GRACE, || {}).unwrap();
        tx.send(()).unwrap();
        handle.join().unwrap();

        assert_eq!(log.lock().unwrap().closes, 1);
    }

    #[test]
    fn cancel_during_slow_read_exits_promptly() {
        let (inst, stall) = StallingInstrument::new(Duration::from_secs(3));
        let device = Device::new(inst);
        let (tx, rx) = mpsc::channel();
        let (done_tx, done_rx) = mpsc::channel();

        let grace = Duration::from_millis(100);
        let watcher = spawn_watcher(device.clone(), rx, grace, move || {
            let _ = done_tx.send(Instant::now());
        })
        .unwrap();
        let reader = {
            let device = device.clone();
            thread::spawn(move || device.read(16))
        };
        thread::sleep(Duration::from_millis(100));

        let requested = Instant::now();
        tx.send(()).unwrap();
        let finished = done_rx
            .recv_timeout(Duration::from_secs(2))
            .expect("callback should run");
        watcher.join().unwrap();

        let latency = finished.duration_since(requested);
        assert!(latency < Duration::from_millis(500), "cancel took {latency:?}");
        assert!(stall.aborted.load(Ordering::SeqCst));
        assert!(reader.join().unwrap().is_err());
    }
}
