//! Launcher state driven by commands, combos, and rescans

use std::io::Write;
use std::sync::Arc;

use anyhow::Result;
use ezlaunch_core::config::{RESET_GAME_COMBO, SYSTEM_MENU_COMBO};
use ezlaunch_core::library::{RescanTrigger, reset_save_data};
use ezlaunch_core::{ComboFired, GestureRecognizer, Library, LibrarySynchronizer, Selection, Title};

use crate::commands::Command;

/// Whether the command loop should keep running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Everything the headless front end tracks between input lines.
pub struct Session<W: Write> {
    sync: Arc<LibrarySynchronizer>,
    recognizer: GestureRecognizer,
    rescan: RescanTrigger,
    library: Library,
    selection: Selection,
    /// Title whose save data is deleted by the next `confirm`
    pending_reset: Option<Title>,
    out: W,
}

impl<W: Write> Session<W> {
    /// Starts a session on the synchronizer's current library, restoring the
    /// last confirmed position.
    pub fn new(
        sync: Arc<LibrarySynchronizer>,
        recognizer: GestureRecognizer,
        rescan: RescanTrigger,
        out: W,
    ) -> Self {
        let library = sync.library();
        let selection = Selection::restore(&sync, &library);
        Self {
            sync,
            recognizer,
            rescan,
            library,
            selection,
            pending_reset: None,
            out,
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Title waiting for `confirm` to have its save data deleted.
    pub fn pending_reset(&self) -> Option<&Title> {
        self.pending_reset.as_ref()
    }

    pub fn handle_command(&mut self, command: Command) -> Result<Flow> {
        // Button events (releasing the combo) keep a pending reset
        if !matches!(
            command,
            Command::Down(_) | Command::Up(_) | Command::Confirm | Command::Reset
        ) {
            self.cancel_reset()?;
        }

        match command {
            Command::Down(button) => {
                if !self.recognizer.on_key_down(button) {
                    tracing::debug!("{} is not part of any combo", button);
                }
            }
            Command::Up(button) => {
                self.recognizer.on_key_up(button);
            }
            Command::Next => self.move_focus(1)?,
            Command::Prev => self.move_focus(-1)?,
            Command::Focus(index) => {
                self.selection.focus(index, &self.library);
                self.print_focus()?;
            }
            Command::Confirm => match self.pending_reset.take() {
                Some(title) => self.reset(&title)?,
                None => match self.selection.confirm(&self.sync, &self.library) {
                    Some(title) => writeln!(self.out, "launch {}", title.content_path.display())?,
                    None => writeln!(self.out, "library is empty")?,
                },
            },
            Command::Reset => self.request_reset()?,
            Command::List => self.print_library()?,
            Command::Rescan => self.rescan.notify(),
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    pub fn handle_combo(&mut self, fired: &ComboFired) -> Result<()> {
        match fired.name.as_str() {
            SYSTEM_MENU_COMBO => writeln!(self.out, "menu")?,
            RESET_GAME_COMBO => self.request_reset()?,
            other => writeln!(self.out, "combo {}", other)?,
        }
        Ok(())
    }

    /// Replaces the displayed library after a rescan.
    pub fn handle_library(&mut self, library: Library) -> Result<()> {
        let still_present = self.pending_reset.as_ref().is_none_or(|pending| {
            library
                .iter()
                .any(|title| title.content_path == pending.content_path)
        });
        if !still_present {
            self.cancel_reset()?;
        }
        self.selection.on_library_changed(&library);
        self.library = library;
        writeln!(self.out, "library {} titles", self.library.len())?;
        Ok(())
    }

    /// Releases held buttons and cancels pending combos.
    pub fn finish(&mut self) {
        self.recognizer.reset();
        self.sync.stop_watching();
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn move_focus(&mut self, delta: isize) -> Result<()> {
        self.selection.step(delta, &self.library);
        self.print_focus()
    }

    fn print_focus(&mut self) -> Result<()> {
        match self.selection.focused_title(&self.library) {
            Some(title) => writeln!(self.out, "focus {} {}", self.selection.focused(), title.label)?,
            None => writeln!(self.out, "library is empty")?,
        }
        Ok(())
    }

    fn print_library(&mut self) -> Result<()> {
        if self.library.is_empty() {
            writeln!(self.out, "library is empty")?;
            return Ok(());
        }
        for (index, title) in self.library.iter().enumerate() {
            let marker = if index == self.selection.focused() { '>' } else { ' ' };
            let art = if title.has_artwork() { " [art]" } else { "" };
            writeln!(self.out, "{} {:>3} {}{}", marker, index, title.label, art)?;
        }
        Ok(())
    }

    /// Asks for confirmation before deleting the focused title's save data.
    fn request_reset(&mut self) -> Result<()> {
        let Some(title) = self.selection.focused_title(&self.library).cloned() else {
            writeln!(self.out, "library is empty")?;
            return Ok(());
        };
        writeln!(self.out, "reset? {} (confirm to delete save data)", title.label)?;
        self.pending_reset = Some(title);
        Ok(())
    }

    fn cancel_reset(&mut self) -> Result<()> {
        if let Some(title) = self.pending_reset.take() {
            writeln!(self.out, "reset cancelled {}", title.label)?;
        }
        Ok(())
    }

    fn reset(&mut self, title: &Title) -> Result<()> {
        match reset_save_data(title) {
            Ok(outcome) if outcome.any_removed() => {
                writeln!(self.out, "reset {} ({} files)", title.label, outcome.removed.len())?
            }
            Ok(_) => writeln!(self.out, "reset {} (no save data)", title.label)?,
            Err(e) => {
                tracing::warn!("Failed to reset {}: {}", title.label, e);
                writeln!(self.out, "reset {} failed: {}", title.label, e)?
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ezlaunch_core::config::LibraryConfig;
    use ezlaunch_core::library::spawn_rescan_loop;
    use ezlaunch_core::{ButtonId, Combo, Prefs};
    use std::fs;
    use std::path::Path;
    use std::time::Duration;
    use tempfile::TempDir;

    fn output(session: Session<Vec<u8>>) -> String {
        String::from_utf8(session.into_output()).unwrap()
    }

    fn scanned_sync(dir: &Path, files: &[&str]) -> Arc<LibrarySynchronizer> {
        for name in files {
            fs::write(dir.join(name), b"data").unwrap();
        }
        let sync = Arc::new(LibrarySynchronizer::new(
            LibraryConfig::with_directory(dir),
            Prefs::new(dir.join("prefs.toml")),
        ));
        sync.scan();
        sync
    }

    fn session(sync: Arc<LibrarySynchronizer>) -> (Session<Vec<u8>>, ezlaunch_core::library::RescanLoop) {
        let handle = tokio::runtime::Handle::current();
        let rescan = spawn_rescan_loop(&handle, sync.clone(), Duration::from_millis(50), |_| {});
        let session = Session::new(
            sync,
            GestureRecognizer::new(handle),
            rescan.trigger(),
            Vec::new(),
        );
        (session, rescan)
    }

    #[tokio::test]
    async fn test_navigate_and_confirm() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &["Alpha.sfc", "Beta_Game.smc"]);
        let (mut session, _rescan) = session(sync.clone());

        session.handle_command(Command::Next).unwrap();
        session.handle_command(Command::Next).unwrap();
        session.handle_command(Command::Confirm).unwrap();

        assert_eq!(sync.restore_selection(), 1);
        let out = output(session);
        assert!(out.contains("focus 1 Beta Game"));
        assert!(out.contains(&format!(
            "launch {}",
            temp_dir.path().join("Beta_Game.smc").display()
        )));
    }

    #[tokio::test]
    async fn test_restores_last_confirmed_title() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &["a.sfc", "b.sfc", "c.sfc"]);
        sync.persist_selection(2);

        let (session, _rescan) = session(sync);
        assert_eq!(session.selection().focused(), 2);
    }

    fn reset_fired() -> ComboFired {
        ComboFired {
            handle: session_handle(),
            name: RESET_GAME_COMBO.to_string(),
        }
    }

    #[tokio::test]
    async fn test_reset_combo_waits_for_confirm() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &["Game.sfc", "Game.srm", "Game.suspend"]);
        let (mut session, _rescan) = session(sync);

        session.handle_combo(&reset_fired()).unwrap();
        session.handle_command(Command::Up(ButtonId::X)).unwrap();

        assert!(temp_dir.path().join("Game.srm").exists());
        assert!(temp_dir.path().join("Game.suspend").exists());
        assert_eq!(session.pending_reset().unwrap().id, "Game");

        session.handle_command(Command::Confirm).unwrap();

        assert!(!temp_dir.path().join("Game.srm").exists());
        assert!(!temp_dir.path().join("Game.suspend").exists());
        assert!(session.pending_reset().is_none());
        let out = output(session);
        assert!(out.contains("reset? Game"));
        assert!(out.contains("reset Game (2 files)"));
        assert!(!out.contains("launch"));
    }

    #[tokio::test]
    async fn test_other_command_cancels_pending_reset() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &["Game.sfc", "Game.srm", "Other.sfc"]);
        let (mut session, _rescan) = session(sync);

        session.handle_command(Command::Reset).unwrap();
        session.handle_command(Command::Next).unwrap();
        assert!(session.pending_reset().is_none());

        // Confirm now launches the focused title instead
        session.handle_command(Command::Confirm).unwrap();

        assert!(temp_dir.path().join("Game.srm").exists());
        let out = output(session);
        assert!(out.contains("reset cancelled Game"));
        assert!(out.contains(&format!(
            "launch {}",
            temp_dir.path().join("Other.sfc").display()
        )));
    }

    #[tokio::test]
    async fn test_pending_reset_dropped_when_title_disappears() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &["Game.sfc", "Game.srm"]);
        let (mut session, _rescan) = session(sync.clone());

        session.handle_combo(&reset_fired()).unwrap();
        fs::remove_file(temp_dir.path().join("Game.sfc")).unwrap();
        session.handle_library(sync.scan()).unwrap();

        assert!(session.pending_reset().is_none());
        session.handle_command(Command::Confirm).unwrap();
        assert!(temp_dir.path().join("Game.srm").exists());
    }

    #[tokio::test]
    async fn test_library_update_clamps_focus() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &["a.sfc", "b.sfc", "c.sfc"]);
        let (mut session, _rescan) = session(sync.clone());
        session.handle_command(Command::Focus(2)).unwrap();

        fs::remove_file(temp_dir.path().join("c.sfc")).unwrap();
        session.handle_library(sync.scan()).unwrap();

        assert_eq!(session.library().len(), 2);
        assert_eq!(session.selection().focused(), 1);
    }

    #[tokio::test]
    async fn test_empty_library() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &[]);
        let (mut session, _rescan) = session(sync);

        session.handle_command(Command::Confirm).unwrap();
        session.handle_command(Command::Reset).unwrap();
        session.handle_command(Command::List).unwrap();
        assert_eq!(session.handle_command(Command::Quit).unwrap(), Flow::Quit);

        assert_eq!(output(session).matches("library is empty").count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_key_events_reach_recognizer() {
        let temp_dir = TempDir::new().unwrap();
        let sync = scanned_sync(temp_dir.path(), &["Game.sfc"]);
        let handle = tokio::runtime::Handle::current();
        let recognizer = GestureRecognizer::new(handle.clone());
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        recognizer
            .register_combo(Combo::new(
                SYSTEM_MENU_COMBO,
                [ButtonId::Select, ButtonId::Start],
                Duration::from_millis(1000),
                move |fired| {
                    let _ = tx.send(fired.clone());
                },
            ))
            .unwrap();
        let rescan = spawn_rescan_loop(&handle, sync.clone(), Duration::from_millis(50), |_| {});
        let mut session = Session::new(sync, recognizer, rescan.trigger(), Vec::new());

        session.handle_command(Command::Down(ButtonId::Select)).unwrap();
        session.handle_command(Command::Down(ButtonId::Start)).unwrap();
        let fired = rx.recv().await.unwrap();
        session.handle_combo(&fired).unwrap();

        assert_eq!(fired.name, SYSTEM_MENU_COMBO);
        assert!(output(session).contains("menu"));
    }

    fn session_handle() -> ezlaunch_core::ComboHandle {
        let recognizer = GestureRecognizer::new(tokio::runtime::Handle::current());
        recognizer
            .register_combo(Combo::new(
                RESET_GAME_COMBO,
                [ButtonId::X],
                Duration::from_millis(1000),
                |_| {},
            ))
            .unwrap()
    }
}
