use tracing::debug;
use x11rb::protocol::xproto::Window;

use crate::window::registry::ClientRegistry;

/// Picks the next window to focus after an alt-tab, or `None` if there
/// is nothing to switch to.
///
/// Scans forward from `current`'s registry position (wrapping), at most
/// two steps, skipping the wallpaper. If `current` is not registered at
/// all, falls back to the first non-wallpaper entry in registration
/// order.
pub fn next_target(
    clients: &ClientRegistry,
    current: Window,
    wallpaper: Option<Window>,
) -> Option<(Window, Window)> {
    if clients.len() < 2 {
        return None;
    }

    let is_wallpaper =
        |(client, frame): (Window, Window)| Some(client) == wallpaper || Some(frame) == wallpaper;

    match clients.position_of(current) {
        Some(start) => {
            let mut index = start;
            for _ in 0..2 {
                index = (index + 1) % clients.len();
                let entry = clients.get(index)?;
                if !is_wallpaper(entry) {
                    return Some(entry);
                }
                debug!(
                    "Cannot switch to wallpaper {:#x}, trying the next window",
                    entry.0
                );
            }
            None
        }
        None => {
            debug!(
                "Window {:#x} not found in registry, falling back to first entry",
                current
            );
            clients.iter().find(|&entry| !is_wallpaper(entry))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: Window = 1;
    const B: Window = 2;
    const C: Window = 3;

    /// Clients [A, B, C] in registration order, C being the wallpaper.
    fn registry() -> ClientRegistry {
        let mut clients = ClientRegistry::new();
        clients.register(A, 10).unwrap();
        clients.register(B, 20).unwrap();
        clients.register(C, 30).unwrap();
        clients
    }

    #[test]
    fn cycles_to_the_next_window() {
        let clients = registry();
        assert_eq!(next_target(&clients, A, Some(C)), Some((B, 20)));
    }

    #[test]
    fn skips_the_wallpaper() {
        let clients = registry();
        // B's successor is the wallpaper C; the scan continues to A.
        assert_eq!(next_target(&clients, B, Some(C)), Some((A, 10)));
        // Cycling from the wallpaper itself lands on A.
        assert_eq!(next_target(&clients, C, Some(C)), Some((A, 10)));
    }

    #[test]
    fn wallpaper_matched_by_frame_id() {
        let clients = registry();
        // The marker can hold the frame id rather than the client id.
        assert_eq!(next_target(&clients, B, Some(30)), Some((A, 10)));
    }

    #[test]
    fn unknown_window_falls_back_to_first_non_wallpaper() {
        let clients = registry();
        assert_eq!(next_target(&clients, 99, Some(A)), Some((B, 20)));
        assert_eq!(next_target(&clients, 99, None), Some((A, 10)));
    }

    #[test]
    fn needs_at_least_two_windows() {
        let mut clients = ClientRegistry::new();
        assert_eq!(next_target(&clients, A, None), None);
        clients.register(A, 10).unwrap();
        assert_eq!(next_target(&clients, A, None), None);
    }

    #[test]
    fn two_windows_cycle_between_each_other() {
        let mut clients = ClientRegistry::new();
        clients.register(A, 10).unwrap();
        clients.register(B, 20).unwrap();
        assert_eq!(next_target(&clients, A, None), Some((B, 20)));
        assert_eq!(next_target(&clients, B, None), Some((A, 10)));
    }
}
