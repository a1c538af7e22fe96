use x11rb::protocol::xproto::{
    ConfigWindow, ConfigureRequestEvent, ConfigureWindowAux, MapState, StackMode, Window,
};

pub const TITLE_BAR_HEIGHT: u16 = 22;
pub const BORDER_WIDTH: u16 = 1;
pub const BORDER_COLOR: u32 = 0x00cc_cccc;
pub const WALLPAPER_BORDER_COLOR: u32 = 0x0000_0000;
// Same fill for wallpaper and regular frames.
pub const BG_COLOR: u32 = 0x00e6_e6e6;

/// Border decoration for a frame. The wallpaper gets no border so it
/// blends into the root; everything else gets a light grey outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStyle {
    pub border_width: u16,
    pub border_color: u32,
}

impl FrameStyle {
    pub fn for_window(wallpaper: bool) -> Self {
        if wallpaper {
            Self {
                border_width: 0,
                border_color: WALLPAPER_BORDER_COLOR,
            }
        } else {
            Self {
                border_width: BORDER_WIDTH,
                border_color: BORDER_COLOR,
            }
        }
    }
}

/// Pre-existing windows that are override-redirect or not currently
/// viewable must not be captured by the reconciliation pass.
pub fn skip_existing(override_redirect: bool, map_state: MapState) -> bool {
    override_redirect || map_state != MapState::VIEWABLE
}

fn requested(mask: ConfigWindow, field: ConfigWindow) -> bool {
    u16::from(mask) & u16::from(field) != 0
}

/// The subset of a ConfigureRequest we choose to apply to a window.
/// Fields absent from the request's value mask stay `None` so the
/// server keeps the current values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigurePlan {
    pub x: Option<i32>,
    pub y: Option<i32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub border_width: Option<u32>,
    pub sibling: Option<Window>,
    pub stack_mode: Option<StackMode>,
}

impl ConfigurePlan {
    /// Forwards the request unchanged; used for unmanaged windows.
    pub fn passthrough(e: &ConfigureRequestEvent) -> Self {
        let mask = e.value_mask;
        Self {
            x: requested(mask, ConfigWindow::X).then_some(e.x as i32),
            y: requested(mask, ConfigWindow::Y).then_some(e.y as i32),
            width: requested(mask, ConfigWindow::WIDTH).then_some(e.width as u32),
            height: requested(mask, ConfigWindow::HEIGHT).then_some(e.height as u32),
            border_width: requested(mask, ConfigWindow::BORDER_WIDTH)
                .then_some(e.border_width as u32),
            sibling: requested(mask, ConfigWindow::SIBLING).then_some(e.sibling),
            stack_mode: requested(mask, ConfigWindow::STACK_MODE).then_some(e.stack_mode),
        }
    }

    /// What the frame receives for a managed client's request: the
    /// requested geometry with the title bar added on top.
    pub fn for_frame(e: &ConfigureRequestEvent) -> Self {
        let mut plan = Self::passthrough(e);
        plan.height = plan.height.map(|h| h + TITLE_BAR_HEIGHT as u32);
        plan
    }

    /// What the client itself receives: the requested size, but never a
    /// position. The client stays pinned at (0, TITLE_BAR_HEIGHT) inside
    /// its frame.
    pub fn for_client(e: &ConfigureRequestEvent) -> Self {
        let mut plan = Self::passthrough(e);
        plan.x = None;
        plan.y = None;
        plan
    }

    pub fn to_aux(self) -> ConfigureWindowAux {
        let mut aux = ConfigureWindowAux::new();
        if let Some(x) = self.x {
            aux = aux.x(x);
        }
        if let Some(y) = self.y {
            aux = aux.y(y);
        }
        if let Some(width) = self.width {
            aux = aux.width(width);
        }
        if let Some(height) = self.height {
            aux = aux.height(height);
        }
        if let Some(border_width) = self.border_width {
            aux = aux.border_width(border_width);
        }
        if let Some(sibling) = self.sibling {
            aux = aux.sibling(sibling);
        }
        if let Some(stack_mode) = self.stack_mode {
            aux = aux.stack_mode(stack_mode);
        }
        aux
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::CONFIGURE_REQUEST_EVENT;

    fn request(value_mask: ConfigWindow) -> ConfigureRequestEvent {
        ConfigureRequestEvent {
            response_type: CONFIGURE_REQUEST_EVENT,
            stack_mode: StackMode::ABOVE,
            sequence: 0,
            parent: 1,
            window: 0x42,
            sibling: 0x43,
            x: 15,
            y: 30,
            width: 640,
            height: 480,
            border_width: 2,
            value_mask,
        }
    }

    #[test]
    fn passthrough_preserves_value_mask() {
        let e = request(ConfigWindow::X | ConfigWindow::WIDTH);
        let plan = ConfigurePlan::passthrough(&e);
        assert_eq!(
            plan,
            ConfigurePlan {
                x: Some(15),
                width: Some(640),
                ..Default::default()
            }
        );
    }

    #[test]
    fn passthrough_all_fields() {
        let e = request(
            ConfigWindow::X
                | ConfigWindow::Y
                | ConfigWindow::WIDTH
                | ConfigWindow::HEIGHT
                | ConfigWindow::BORDER_WIDTH
                | ConfigWindow::SIBLING
                | ConfigWindow::STACK_MODE,
        );
        let plan = ConfigurePlan::passthrough(&e);
        assert_eq!(
            plan,
            ConfigurePlan {
                x: Some(15),
                y: Some(30),
                width: Some(640),
                height: Some(480),
                border_width: Some(2),
                sibling: Some(0x43),
                stack_mode: Some(StackMode::ABOVE),
            }
        );
    }

    #[test]
    fn frame_height_includes_title_bar() {
        let e = request(ConfigWindow::WIDTH | ConfigWindow::HEIGHT);
        let plan = ConfigurePlan::for_frame(&e);
        assert_eq!(plan.width, Some(640));
        assert_eq!(plan.height, Some(480 + TITLE_BAR_HEIGHT as u32));

        // Height untouched when the request does not include it.
        let e = request(ConfigWindow::X);
        assert_eq!(ConfigurePlan::for_frame(&e).height, None);
    }

    #[test]
    fn client_plan_never_moves_the_client() {
        let e = request(
            ConfigWindow::X | ConfigWindow::Y | ConfigWindow::WIDTH | ConfigWindow::HEIGHT,
        );
        let plan = ConfigurePlan::for_client(&e);
        assert_eq!(plan.x, None);
        assert_eq!(plan.y, None);
        assert_eq!(plan.width, Some(640));
        assert_eq!(plan.height, Some(480));
    }

    #[test]
    fn wallpaper_style_has_no_border() {
        assert_eq!(
            FrameStyle::for_window(true),
            FrameStyle {
                border_width: 0,
                border_color: WALLPAPER_BORDER_COLOR
            }
        );
        assert_eq!(
            FrameStyle::for_window(false),
            FrameStyle {
                border_width: BORDER_WIDTH,
                border_color: BORDER_COLOR
            }
        );
    }

    #[test]
    fn reconciliation_skips_special_windows() {
        assert!(skip_existing(true, MapState::VIEWABLE));
        assert!(skip_existing(false, MapState::UNMAPPED));
        assert!(skip_existing(false, MapState::UNVIEWABLE));
        assert!(!skip_existing(false, MapState::VIEWABLE));
    }
}
