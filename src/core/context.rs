use anyhow::Result;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::ConnectionExt;
use x11rb::rust_connection::RustConnection;

x11rb::atom_manager! {
    pub Atoms: AtomsCookie {
        WM_PROTOCOLS,
        WM_DELETE_WINDOW,
    }
}

// Keysyms for the fixed key bindings (X11/keysymdef.h).
pub const XK_TAB: u32 = 0xff09;
pub const XK_F4: u32 = 0xffc1;

/// Owns the single connection to the X server plus the handful of
/// per-session values everything else needs. No policy lives here.
pub struct Context {
    pub conn: RustConnection,
    pub screen_num: usize,
    pub root_window: u32,
    pub root_depth: u8,
    pub atoms: Atoms,
    pub display_name: String,
}

impl Context {
    pub fn new(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display)?;
        let screen = &conn.setup().roots[screen_num];
        let root_window = screen.root;
        let root_depth = screen.root_depth;

        let atoms = Atoms::new(&conn)?.reply()?;

        let display_name = display
            .map(str::to_owned)
            .or_else(|| std::env::var("DISPLAY").ok())
            .unwrap_or_default();

        Ok(Self {
            conn,
            screen_num,
            root_window,
            root_depth,
            atoms,
            display_name,
        })
    }

    /// x11rb has no XKeysymToKeycode; scan the keyboard mapping for the
    /// first keycode whose keysym list contains the requested keysym.
    pub fn keysym_to_keycode(&self, keysym: u32) -> Result<Option<u8>> {
        let setup = self.conn.setup();
        let (min, max) = (setup.min_keycode, setup.max_keycode);
        let mapping = self.conn.get_keyboard_mapping(min, max - min + 1)?.reply()?;
        let per = mapping.keysyms_per_keycode as usize;

        for (i, syms) in mapping.keysyms.chunks(per).enumerate() {
            if syms.contains(&keysym) {
                return Ok(Some(min + i as u8));
            }
        }
        Ok(None)
    }
}
