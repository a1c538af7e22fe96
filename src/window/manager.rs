use anyhow::Result;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use x11rb::connection::Connection;
use x11rb::errors::ReplyError;
use x11rb::protocol::xproto::{
    Atom, AtomEnum, ButtonIndex, ButtonPressEvent, ChangeWindowAttributesAux, ClientMessageData,
    ClientMessageEvent, ConfigureRequestEvent, ConfigureWindowAux, ConnectionExt, CreateWindowAux,
    EventMask, GrabMode, InputFocus, KeyButMask, KeyPressEvent, MapRequestEvent,
    MotionNotifyEvent, ModMask, SetMode, StackMode, UnmapNotifyEvent, Window, WindowClass,
    CLIENT_MESSAGE_EVENT,
};
use x11rb::protocol::{ErrorKind, Event};

use crate::core::context::{Context, XK_F4, XK_TAB};
use crate::window::drag::DragSession;
use crate::window::events;
use crate::window::focus;
use crate::window::frame::{self, FrameStyle, TITLE_BAR_HEIGHT};
use crate::window::registry::{ClientRegistry, RegistryError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("another window manager is already running on display {display}")]
    AlreadyRunning { display: String },
    #[error(transparent)]
    Protocol(#[from] ReplyError),
}

/// The window-management engine: owns the client registry, the
/// wallpaper marker and the drag state, and drives the blocking event
/// loop over the single X connection.
pub struct WindowManager {
    ctx: Context,
    clients: ClientRegistry,
    /// Designated background window, set at most once per process.
    wallpaper: Option<Window>,
    drag: Option<DragSession>,
    close_keycode: u8,
    cycle_keycode: u8,
    /// One-event pushback slot used by motion coalescing.
    pending: Option<Event>,
}

impl WindowManager {
    pub fn new(ctx: Context) -> Result<Self> {
        let close_keycode = ctx
            .keysym_to_keycode(XK_F4)?
            .ok_or_else(|| anyhow::anyhow!("keyboard mapping has no keycode for F4"))?;
        let cycle_keycode = ctx
            .keysym_to_keycode(XK_TAB)?
            .ok_or_else(|| anyhow::anyhow!("keyboard mapping has no keycode for Tab"))?;

        Ok(Self {
            ctx,
            clients: ClientRegistry::new(),
            wallpaper: None,
            drag: None,
            close_keycode,
            cycle_keycode,
            pending: None,
        })
    }

    /// Claims substructure redirection on the root window. The server
    /// only grants it to one client at a time, so an Access error here
    /// means another window manager is already active.
    pub fn take_control(&self) -> Result<(), StartupError> {
        let values = ChangeWindowAttributesAux::new()
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY);
        let cookie = self
            .ctx
            .conn
            .change_window_attributes(self.ctx.root_window, &values)
            .map_err(ReplyError::from)?;

        match cookie.check() {
            Ok(()) => Ok(()),
            Err(ReplyError::X11Error(ref e)) if e.error_kind == ErrorKind::Access => {
                Err(StartupError::AlreadyRunning {
                    display: self.ctx.display_name.clone(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Startup reconciliation: frames the top-level windows that existed
    /// before we attached. The server is grabbed so the tree cannot
    /// change under the scan; the first child (if any) is the wallpaper
    /// candidate.
    pub fn reparent_existing(&mut self) -> Result<()> {
        self.ctx.conn.grab_server()?;
        let result = self.scan_children();
        self.ctx.conn.ungrab_server()?;
        self.ctx.conn.flush()?;
        result
    }

    fn scan_children(&mut self) -> Result<()> {
        let tree = self.ctx.conn.query_tree(self.ctx.root_window)?.reply()?;
        info!("Scanning {} existing top-level windows", tree.children.len());

        for (i, &win) in tree.children.iter().enumerate() {
            match self.frame_window(win, true, i == 0) {
                Ok(Some(_)) => {}
                Ok(None) => debug!("Skipped pre-existing window {:#x}", win),
                // A window vanishing mid-scan only aborts its own framing.
                Err(e) => warn!("Could not frame pre-existing window {:#x}: {}", win, e),
            }
        }
        Ok(())
    }

    /// Wraps `win` in a newly created frame and registers the pair.
    /// Returns the frame id, or `None` if a pre-existing window was
    /// rejected (override-redirect or not viewable).
    fn frame_window(
        &mut self,
        win: Window,
        pre_existing: bool,
        wallpaper_candidate: bool,
    ) -> Result<Option<Window>> {
        let wallpaper = wallpaper_candidate || (self.wallpaper.is_none() && self.clients.is_empty());

        let attrs = self.ctx.conn.get_window_attributes(win)?.reply()?;
        let geom = self.ctx.conn.get_geometry(win)?.reply()?;

        if pre_existing && frame::skip_existing(attrs.override_redirect, attrs.map_state) {
            return Ok(None);
        }

        if self.clients.is_managed(win) {
            return Err(RegistryError::AlreadyManaged(win).into());
        }

        if wallpaper && self.wallpaper.is_none() {
            self.wallpaper = Some(win);
            info!("Window {:#x} designated as wallpaper", win);
        }

        let style = FrameStyle::for_window(wallpaper);
        let frame = self.ctx.conn.generate_id()?;
        let values = CreateWindowAux::new()
            .event_mask(EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY)
            .background_pixel(frame::BG_COLOR)
            .border_pixel(style.border_color);
        self.ctx.conn.create_window(
            self.ctx.root_depth,
            frame,
            self.ctx.root_window,
            geom.x,
            geom.y,
            geom.width,
            geom.height + TITLE_BAR_HEIGHT,
            style.border_width,
            WindowClass::INPUT_OUTPUT,
            0,
            &values,
        )?;

        // Keep the client alive and visible if we exit abruptly.
        self.ctx.conn.change_save_set(SetMode::INSERT, win)?;
        self.ctx.conn.reparent_window(win, frame, 0, TITLE_BAR_HEIGHT as i16)?;
        self.ctx.conn.map_window(frame)?;

        self.clients.register(win, frame)?;

        // Title-bar stripe across the frame's top. No controls yet.
        let title_bar = self.ctx.conn.generate_id()?;
        let tb_values = CreateWindowAux::new().background_pixel(frame::BG_COLOR);
        self.ctx.conn.create_window(
            self.ctx.root_depth,
            title_bar,
            frame,
            0,
            0,
            geom.width,
            TITLE_BAR_HEIGHT,
            0,
            WindowClass::INPUT_OUTPUT,
            0,
            &tb_values,
        )?;
        self.ctx.conn.map_window(title_bar)?;

        if !wallpaper {
            self.grab_drag_buttons(win)?;
            self.grab_key_on(win, self.close_keycode)?;
        }
        // Cycling must work even from the wallpaper.
        self.grab_key_on(win, self.cycle_keycode)?;

        info!("Framed window {:#x} [{:#x}]", win, frame);
        Ok(Some(frame))
    }

    /// Reverses the steps taken by `frame_window`. Unmap before destroy,
    /// so the registry entry is gone before any notification about the
    /// dying frame arrives.
    fn unframe_window(&mut self, win: Window) -> Result<()> {
        let frame = self
            .clients
            .frame_of(win)
            .ok_or(RegistryError::NotManaged(win))?;

        self.ctx.conn.unmap_window(frame)?;
        self.ctx.conn.reparent_window(win, self.ctx.root_window, 0, 0)?;
        self.ctx.conn.change_save_set(SetMode::DELETE, win)?;
        self.ctx.conn.destroy_window(frame)?;
        self.clients.unregister(win)?;

        info!("Unframed window {:#x} [{:#x}]", win, frame);
        Ok(())
    }

    fn grab_drag_buttons(&self, win: Window) -> Result<()> {
        // Mod1+Button1 moves, Mod1+Button3 resizes.
        for button in [ButtonIndex::M1, ButtonIndex::M3] {
            self.ctx.conn.grab_button(
                false,
                win,
                EventMask::BUTTON_PRESS | EventMask::BUTTON_RELEASE | EventMask::BUTTON_MOTION,
                GrabMode::ASYNC,
                GrabMode::ASYNC,
                x11rb::NONE,
                x11rb::NONE,
                button,
                ModMask::M1,
            )?;
        }
        Ok(())
    }

    fn grab_key_on(&self, win: Window, keycode: u8) -> Result<()> {
        self.ctx.conn.grab_key(
            false,
            win,
            ModMask::M1,
            keycode,
            GrabMode::ASYNC,
            GrabMode::ASYNC,
        )?;
        Ok(())
    }

    /// The steady-state loop. Only a fatal connection error ends it.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.ctx.conn.flush()?;
            let event = match self.pending.take() {
                Some(event) => event,
                None => self.ctx.conn.wait_for_event()?,
            };
            let event = self.coalesce_motion(event)?;
            debug!("Received event: {}", events::describe(&event));
            // A handler hitting a window that vanished mid-flight is a
            // survivable race; only connection loss ends the loop.
            if let Err(e) = self.dispatch(event) {
                error!("Error handling event: {:#}", e);
            }
        }
    }

    /// Collapses a backlog of queued motion events for the same window
    /// into the most recent one, so a fast pointer never outruns us.
    /// The first non-matching event goes into the pushback slot.
    fn coalesce_motion(&mut self, event: Event) -> Result<Event> {
        let Event::MotionNotify(mut motion) = event else {
            return Ok(event);
        };
        while let Some(next) = self.ctx.conn.poll_for_event()? {
            match next {
                Event::MotionNotify(m) if m.event == motion.event => motion = m,
                other => {
                    self.pending = Some(other);
                    break;
                }
            }
        }
        Ok(Event::MotionNotify(motion))
    }

    fn dispatch(&mut self, event: Event) -> Result<()> {
        match event {
            // Observation points only; the log line above is their sole effect.
            Event::CreateNotify(_)
            | Event::DestroyNotify(_)
            | Event::ReparentNotify(_)
            | Event::MapNotify(_)
            | Event::ConfigureNotify(_) => {}
            Event::MapRequest(e) => self.on_map_request(e)?,
            Event::ConfigureRequest(e) => self.on_configure_request(e)?,
            Event::UnmapNotify(e) => self.on_unmap_notify(e)?,
            Event::ButtonPress(e) => self.on_button_press(e)?,
            Event::ButtonRelease(_) => {}
            Event::MotionNotify(e) => self.on_motion_notify(e)?,
            Event::KeyPress(e) => self.on_key_press(e)?,
            Event::KeyRelease(_) => {}
            // Protocol errors are logged and survived: the window tree
            // mutates under us and targets can vanish at any time.
            Event::Error(e) => error!("Received {}", events::describe_error(&e)),
            other => debug!("Ignoring unhandled event: {:?}", other),
        }
        Ok(())
    }

    fn on_map_request(&mut self, e: MapRequestEvent) -> Result<()> {
        if !self.clients.is_managed(e.window) {
            self.frame_window(e.window, false, false)?;
        }
        self.ctx.conn.map_window(e.window)?;
        Ok(())
    }

    fn on_configure_request(&mut self, e: ConfigureRequestEvent) -> Result<()> {
        if let Some(frame) = self.clients.frame_of(e.window) {
            // The client is always reconfigured, even for a pure move of
            // the frame; see DESIGN.md.
            let frame_plan = frame::ConfigurePlan::for_frame(&e);
            let client_plan = frame::ConfigurePlan::for_client(&e);
            self.ctx.conn.configure_window(frame, &frame_plan.to_aux())?;
            self.ctx.conn.configure_window(e.window, &client_plan.to_aux())?;
            debug!(
                "Configured frame {:#x} and client {:#x} to requested {}x{}",
                frame, e.window, e.width, e.height
            );
        } else {
            let plan = frame::ConfigurePlan::passthrough(&e);
            self.ctx.conn.configure_window(e.window, &plan.to_aux())?;
            debug!("Configured unmanaged window {:#x} as requested", e.window);
        }
        Ok(())
    }

    fn on_unmap_notify(&mut self, e: UnmapNotifyEvent) -> Result<()> {
        if !self.clients.is_managed(e.window) {
            debug!("Ignoring UnmapNotify for non-client window {:#x}", e.window);
            return Ok(());
        }
        // Our own reconciliation reparent generates an UnmapNotify whose
        // event window is the root; that one must not trigger unframing.
        if e.event == self.ctx.root_window {
            debug!(
                "Ignoring UnmapNotify for reparented pre-existing window {:#x}",
                e.window
            );
            return Ok(());
        }
        self.unframe_window(e.window)
    }

    fn on_button_press(&mut self, e: ButtonPressEvent) -> Result<()> {
        let Some(frame) = self.clients.frame_of(e.event) else {
            // Stale grab: the window can be unframed between the grab
            // firing and us reading the event.
            warn!("ButtonPress for unmanaged window {:#x}", e.event);
            return Ok(());
        };

        let geom = self.ctx.conn.get_geometry(frame)?.reply()?;
        self.drag = Some(DragSession {
            start_pointer: (e.root_x, e.root_y),
            start_frame_pos: (geom.x, geom.y),
            start_frame_size: (geom.width, geom.height),
        });

        self.ctx.conn.configure_window(
            frame,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        Ok(())
    }

    fn on_motion_notify(&mut self, e: MotionNotifyEvent) -> Result<()> {
        let Some(frame) = self.clients.frame_of(e.event) else {
            debug!("Ignoring motion for unmanaged window {:#x}", e.event);
            return Ok(());
        };
        let Some(drag) = self.drag else {
            warn!("Motion for window {:#x} without a drag session", e.event);
            return Ok(());
        };

        let state = u16::from(e.state);
        if state & u16::from(KeyButMask::BUTTON1) != 0 {
            let (x, y) = drag.move_destination(e.root_x, e.root_y);
            self.ctx
                .conn
                .configure_window(frame, &ConfigureWindowAux::new().x(x).y(y))?;
            debug!("Moved frame {:#x} to ({}, {})", frame, x, y);
        } else if state & u16::from(KeyButMask::BUTTON3) != 0 {
            let target = drag.resize_destination(e.root_x, e.root_y);
            self.ctx.conn.configure_window(
                frame,
                &ConfigureWindowAux::new()
                    .width(target.frame_width as u32)
                    .height(target.frame_height as u32),
            )?;
            self.ctx.conn.configure_window(
                e.event,
                &ConfigureWindowAux::new()
                    .width(target.frame_width as u32)
                    .height(target.client_height as u32),
            )?;
            debug!(
                "Resized frame {:#x} to {}x{}",
                frame, target.frame_width, target.frame_height
            );
        }
        Ok(())
    }

    fn on_key_press(&mut self, e: KeyPressEvent) -> Result<()> {
        if u16::from(e.state) & u16::from(KeyButMask::MOD1) == 0 {
            return Ok(());
        }
        if e.detail == self.close_keycode {
            self.close_window(e.event)?;
        } else if e.detail == self.cycle_keycode {
            self.cycle_focus(e.event)?;
        }
        Ok(())
    }

    /// Polite close when the client opted into WM_DELETE_WINDOW,
    /// otherwise a forced disconnect.
    fn close_window(&self, win: Window) -> Result<()> {
        if advertises_protocol(&self.wm_protocols(win)?, self.ctx.atoms.WM_DELETE_WINDOW) {
            info!("Gracefully deleting window {:#x}", win);
            let event = ClientMessageEvent {
                response_type: CLIENT_MESSAGE_EVENT,
                format: 32,
                sequence: 0,
                window: win,
                type_: self.ctx.atoms.WM_PROTOCOLS,
                data: ClientMessageData::from([
                    self.ctx.atoms.WM_DELETE_WINDOW,
                    x11rb::CURRENT_TIME,
                    0,
                    0,
                    0,
                ]),
            };
            self.ctx.conn.send_event(false, win, EventMask::NO_EVENT, event)?;
        } else {
            info!("Killing window {:#x}", win);
            self.ctx.conn.kill_client(win)?;
        }
        Ok(())
    }

    /// The protocols a window advertises via WM_PROTOCOLS; empty if the
    /// property is missing or malformed.
    fn wm_protocols(&self, win: Window) -> Result<Vec<Atom>> {
        let reply = self
            .ctx
            .conn
            .get_property(
                false,
                win,
                self.ctx.atoms.WM_PROTOCOLS,
                AtomEnum::ATOM,
                0,
                32,
            )?
            .reply();
        let Ok(reply) = reply else {
            return Ok(Vec::new());
        };
        if reply.format != 32 {
            return Ok(Vec::new());
        }
        Ok(reply.value32().map(|it| it.collect()).unwrap_or_default())
    }

    fn cycle_focus(&self, current: Window) -> Result<()> {
        let Some((client, frame)) = focus::next_target(&self.clients, current, self.wallpaper)
        else {
            debug!("No focus-cycle target available");
            return Ok(());
        };
        self.ctx.conn.configure_window(
            frame,
            &ConfigureWindowAux::new().stack_mode(StackMode::ABOVE),
        )?;
        self.ctx
            .conn
            .set_input_focus(InputFocus::POINTER_ROOT, client, x11rb::CURRENT_TIME)?;
        info!("Focus switched to window {:#x}", client);
        Ok(())
    }
}

fn advertises_protocol(protocols: &[Atom], protocol: Atom) -> bool {
    protocols.contains(&protocol)
}
