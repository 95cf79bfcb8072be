//! Event loop driving a `PlaybackController`.

use narrator_core::{PlaybackEvent, TransportCommand};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::controller::PlaybackController;

/// Producer side of the controller's event queue. Cloned into timers, speech
/// callbacks and UI handlers.
pub type EventSender = mpsc::UnboundedSender<PlaybackEvent>;

/// Drive `controller` until `shutdown` fires or both inboxes close, then
/// dispose it and hand it back.
///
/// Events are processed one at a time; a transition always completes before
/// the next event is taken.
pub async fn run_controller(
    mut controller: PlaybackController,
    mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
    mut transport: mpsc::UnboundedReceiver<TransportCommand>,
    mut shutdown: oneshot::Receiver<()>,
) -> PlaybackController {
    controller.start();
    let mut transport_open = true;

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                info!("shutdown requested");
                break;
            }
            event = events.recv() => match event {
                Some(event) => controller.handle_event(event).await,
                None => {
                    debug!("event channel closed");
                    break;
                }
            },
            command = transport.recv(), if transport_open => match command {
                Some(command) => {
                    debug!(?command, "transport command");
                    controller.handle_transport(command).await;
                }
                None => transport_open = false,
            },
        }
    }

    controller.dispose().await;
    controller
}
