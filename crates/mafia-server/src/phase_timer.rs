//! Per-room phase timers.
//!
//! Each started room gets one task that sleeps until the current phase's
//! deadline, then advances the room under the manager's write lock. The
//! write lock is the same one every player request takes, so a timer fire
//! never interleaves with a vote or night action on the same room.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::room_manager::{PhaseDeadline, RoomManager};
use crate::state::SharedRoomManager;

/// Spawn the timer task for a room whose first timed phase ends at `first`.
/// The task follows the room from phase to phase and exits once the room is
/// gone or the game is over.
pub fn spawn_phase_timer(rooms: SharedRoomManager, first: PhaseDeadline) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut deadline = first;
        loop {
            tokio::time::sleep(deadline.after).await;
            let next = {
                let mut mgr = rooms.write().await;
                mgr.fire_phase_timer(&deadline)
            };
            match next {
                Some(next) => deadline = next,
                None => break,
            }
        }
        tracing::debug!(room = %deadline.room_code, "Phase timer stopped");
    })
}

/// Spawn the timer for `deadline` and hand it to its room. `mgr` must be the
/// write guard of `rooms`.
pub fn arm(rooms: &SharedRoomManager, mgr: &mut RoomManager, deadline: PhaseDeadline) {
    let handle = spawn_phase_timer(Arc::clone(rooms), deadline.clone());
    mgr.attach_timer(&deadline, handle);
}
