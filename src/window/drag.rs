use crate::window::frame::TITLE_BAR_HEIGHT;

/// State captured at the button-press that begins an interactive move
/// or resize. Each motion event is interpreted as a delta from here.
/// The session is simply overwritten by the next button-press;
/// button-release carries no action, so nothing clears it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragSession {
    /// Pointer position in root coordinates.
    pub start_pointer: (i16, i16),
    /// Frame position at the start of the gesture.
    pub start_frame_pos: (i16, i16),
    /// Frame size (title bar included) at the start of the gesture.
    pub start_frame_size: (u16, u16),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeTarget {
    pub frame_width: u16,
    pub frame_height: u16,
    pub client_height: u16,
}

impl DragSession {
    /// Where the frame should move to for the given pointer position.
    pub fn move_destination(&self, root_x: i16, root_y: i16) -> (i32, i32) {
        let dx = root_x as i32 - self.start_pointer.0 as i32;
        let dy = root_y as i32 - self.start_pointer.1 as i32;
        (
            self.start_frame_pos.0 as i32 + dx,
            self.start_frame_pos.1 as i32 + dy,
        )
    }

    /// Frame and client sizes for the given pointer position. The delta
    /// is clamped per axis so the frame cannot shrink past zero, then
    /// the result is clamped to the absolute minimums: 1 pixel wide and
    /// tall enough that at least one client pixel sits below the title
    /// bar.
    pub fn resize_destination(&self, root_x: i16, root_y: i16) -> ResizeTarget {
        let (start_w, start_h) = (
            self.start_frame_size.0 as i32,
            self.start_frame_size.1 as i32,
        );
        let dx = (root_x as i32 - self.start_pointer.0 as i32).max(-start_w);
        let dy = (root_y as i32 - self.start_pointer.1 as i32).max(-start_h);

        let frame_width = (start_w + dx).clamp(1, u16::MAX as i32) as u16;
        let frame_height = (start_h + dy)
            .clamp(TITLE_BAR_HEIGHT as i32 + 1, u16::MAX as i32) as u16;

        ResizeTarget {
            frame_width,
            frame_height,
            client_height: frame_height - TITLE_BAR_HEIGHT,
        }
    }
}
