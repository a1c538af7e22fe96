use thiserror::Error;
use x11rb::protocol::xproto::Window;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("window {0:#x} is already managed")]
    AlreadyManaged(Window),
    #[error("window {0:#x} is not managed")]
    NotManaged(Window),
}

/// Maps each managed client window to its frame window.
///
/// Backed by a vector so iteration yields entries in registration
/// order; wallpaper designation and focus cycling both depend on that
/// order being stable. A window is managed iff it is a key here.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    entries: Vec<(Window, Window)>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_managed(&self, client: Window) -> bool {
        self.entries.iter().any(|&(c, _)| c == client)
    }

    pub fn frame_of(&self, client: Window) -> Option<Window> {
        self.entries
            .iter()
            .find(|&&(c, _)| c == client)
            .map(|&(_, f)| f)
    }

    pub fn register(&mut self, client: Window, frame: Window) -> Result<(), RegistryError> {
        if self.is_managed(client) {
            return Err(RegistryError::AlreadyManaged(client));
        }
        self.entries.push((client, frame));
        Ok(())
    }

    /// Removes the entry for `client`, returning its frame.
    pub fn unregister(&mut self, client: Window) -> Result<Window, RegistryError> {
        let index = self
            .position_of(client)
            .ok_or(RegistryError::NotManaged(client))?;
        let (_, frame) = self.entries.remove(index);
        Ok(frame)
    }

    pub fn position_of(&self, client: Window) -> Option<usize> {
        self.entries.iter().position(|&(c, _)| c == client)
    }

    pub fn get(&self, index: usize) -> Option<(Window, Window)> {
        self.entries.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Window, Window)> + '_ {
        self.entries.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_and_lookup() {
        let mut registry = ClientRegistry::new();
        registry.register(10, 100).unwrap();
        registry.register(20, 200).unwrap();

        assert!(registry.is_managed(10));
        assert!(!registry.is_managed(100));
        assert_eq!(registry.frame_of(20), Some(200));
        assert_eq!(registry.frame_of(30), None);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn duplicate_registration_fails() {
        let mut registry = ClientRegistry::new();
        registry.register(10, 100).unwrap();
        assert_eq!(
            registry.register(10, 300),
            Err(RegistryError::AlreadyManaged(10))
        );
        // The original mapping is untouched.
        assert_eq!(registry.frame_of(10), Some(100));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unregister_unknown_fails() {
        let mut registry = ClientRegistry::new();
        assert_eq!(registry.unregister(42), Err(RegistryError::NotManaged(42)));

        registry.register(42, 420).unwrap();
        assert_eq!(registry.unregister(42), Ok(420));
        assert!(!registry.is_managed(42));
        assert_eq!(registry.unregister(42), Err(RegistryError::NotManaged(42)));
    }

    #[test]
    fn iteration_preserves_registration_order() {
        let mut registry = ClientRegistry::new();
        registry.register(3, 30).unwrap();
        registry.register(1, 10).unwrap();
        registry.register(2, 20).unwrap();

        let entries: Vec<_> = registry.iter().collect();
        assert_eq!(entries, vec![(3, 30), (1, 10), (2, 20)]);

        registry.unregister(1).unwrap();
        let entries: Vec<_> = registry.iter().collect();
        assert_eq!(entries, vec![(3, 30), (2, 20)]);
        assert_eq!(registry.position_of(2), Some(1));
    }

    #[test]
    fn frames_are_never_shared() {
        let mut registry = ClientRegistry::new();
        registry.register(1, 10).unwrap();
        registry.register(2, 20).unwrap();
        registry.unregister(1).unwrap();
        registry.register(1, 11).unwrap();

        // Every client has exactly one frame.
        for (client, _) in registry.iter() {
            let frames: Vec<_> = registry
                .iter()
                .filter(|&(c, _)| c == client)
                .map(|(_, f)| f)
                .collect();
            assert_eq!(frames.len(), 1);
        }
    }
}
