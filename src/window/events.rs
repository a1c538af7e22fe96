//! Diagnostic rendering of X events, for logging only. Dispatch works
//! directly on [`x11rb::protocol::Event`]; this module just turns the
//! handled kinds into readable one-liners with the properties worth
//! seeing in a trace.

use x11rb::protocol::Event;
use x11rb::protocol::xproto::Window;
use x11rb::x11_utils::X11Error;

fn win(w: Window) -> String {
    format!("{:#x}", w)
}

pub fn describe(event: &Event) -> String {
    match event {
        Event::CreateNotify(e) => format!(
            "CreateNotify {{ window: {}, parent: {}, position: ({}, {}), size: {}x{}, border_width: {}, override_redirect: {} }}",
            win(e.window), win(e.parent), e.x, e.y, e.width, e.height, e.border_width, e.override_redirect
        ),
        Event::DestroyNotify(e) => format!("DestroyNotify {{ window: {} }}", win(e.window)),
        Event::MapNotify(e) => format!(
            "MapNotify {{ window: {}, event: {}, override_redirect: {} }}",
            win(e.window), win(e.event), e.override_redirect
        ),
        Event::UnmapNotify(e) => format!(
            "UnmapNotify {{ window: {}, event: {}, from_configure: {} }}",
            win(e.window), win(e.event), e.from_configure
        ),
        Event::ReparentNotify(e) => format!(
            "ReparentNotify {{ window: {}, parent: {}, position: ({}, {}), override_redirect: {} }}",
            win(e.window), win(e.parent), e.x, e.y, e.override_redirect
        ),
        Event::ConfigureNotify(e) => format!(
            "ConfigureNotify {{ window: {}, position: ({}, {}), size: {}x{}, border_width: {}, override_redirect: {} }}",
            win(e.window), e.x, e.y, e.width, e.height, e.border_width, e.override_redirect
        ),
        Event::MapRequest(e) => format!("MapRequest {{ window: {} }}", win(e.window)),
        Event::ConfigureRequest(e) => format!(
            "ConfigureRequest {{ window: {}, parent: {}, position: ({}, {}), size: {}x{}, value_mask: {:#x} }}",
            win(e.window), win(e.parent), e.x, e.y, e.width, e.height, u16::from(e.value_mask)
        ),
        Event::ButtonPress(e) => format!(
            "ButtonPress {{ window: {}, button: {}, state: {:#x}, root: ({}, {}) }}",
            win(e.event), e.detail, u16::from(e.state), e.root_x, e.root_y
        ),
        Event::ButtonRelease(e) => format!(
            "ButtonRelease {{ window: {}, button: {}, state: {:#x}, root: ({}, {}) }}",
            win(e.event), e.detail, u16::from(e.state), e.root_x, e.root_y
        ),
        Event::MotionNotify(e) => format!(
            "MotionNotify {{ window: {}, state: {:#x}, root: ({}, {}) }}",
            win(e.event), u16::from(e.state), e.root_x, e.root_y
        ),
        Event::KeyPress(e) => format!(
            "KeyPress {{ window: {}, keycode: {}, state: {:#x} }}",
            win(e.event), e.detail, u16::from(e.state)
        ),
        Event::KeyRelease(e) => format!(
            "KeyRelease {{ window: {}, keycode: {}, state: {:#x} }}",
            win(e.event), e.detail, u16::from(e.state)
        ),
        Event::Error(e) => describe_error(e),
        other => format!("{:?}", other),
    }
}

pub fn describe_error(e: &X11Error) -> String {
    format!(
        "X error {{ request: {} ({}), error: {:?} (code {}), resource id: {} }}",
        e.major_opcode,
        e.request_name.unwrap_or("Unknown"),
        e.error_kind,
        e.error_code,
        win(e.bad_value)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use x11rb::protocol::xproto::{
        MapRequestEvent, UnmapNotifyEvent, MAP_REQUEST_EVENT, UNMAP_NOTIFY_EVENT,
    };

    #[test]
    fn map_request_rendering() {
        let event = Event::MapRequest(MapRequestEvent {
            response_type: MAP_REQUEST_EVENT,
            sequence: 0,
            parent: 0x1,
            window: 0x2a,
        });
        assert_eq!(describe(&event), "MapRequest { window: 0x2a }");
    }

    #[test]
    fn unmap_notify_rendering() {
        let event = Event::UnmapNotify(UnmapNotifyEvent {
            response_type: UNMAP_NOTIFY_EVENT,
            sequence: 0,
            event: 0x1,
            window: 0x2a,
            from_configure: false,
        });
        assert_eq!(
            describe(&event),
            "UnmapNotify { window: 0x2a, event: 0x1, from_configure: false }"
        );
    }
}
