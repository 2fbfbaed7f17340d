//! Bridge from a keyring's unlock flag to a session.

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::session::SessionHandle;

/// Forward lock/unlock transitions of `unlocked` into `session`.
///
/// The current value is applied immediately, locking an unlocked session
/// if the keyring starts out locked. The bridge ends when the keyring
/// drops its sender or the session shuts down.
pub fn bind_keyring(mut unlocked: watch::Receiver<bool>, session: SessionHandle) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut current = *unlocked.borrow_and_update();
        let initial = if current {
            session.unlock().await
        } else {
            session.lock().await
        };
        if initial.is_err() {
            return;
        }

        while unlocked.changed().await.is_ok() {
            let next = *unlocked.borrow_and_update();
            if next == current {
                continue;
            }
            current = next;
            let result = if next {
                session.unlock().await
            } else {
                session.lock().await
            };
            if result.is_err() {
                tracing::debug!("Session closed; keyring bridge stopping");
                return;
            }
        }
        tracing::debug!("Keyring dropped; bridge stopping");
    })
}
