use super::{App, AppFlow, AppIo};
use crate::auth;
use crate::widgets::{Rect, Widget};

const USAGE: &str = "Commands: /register <name> <password>, /login <name> <password>, /logout, /whoami, /quit";

/// Registration and sign-in over the store's user table
#[derive(Debug, Default)]
pub struct Accounts {
    /// Mirrors the session user for the header label
    shown_user: Option<String>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    fn credentials(args: &str) -> Option<(&str, &str)> {
        let mut parts = args.split_whitespace();
        let name = parts.next()?;
        let password = parts.next()?;
        parts.next().is_none().then_some((name, password))
    }
}

impl App for Accounts {
    fn title(&self) -> &str {
        "Accounts"
    }

    fn on_start(&mut self, io: &mut AppIo<'_>) {
        io.log.push("USER ACCOUNTS");
        io.log
            .push(format!("{} user(s) registered.", io.store.user_count()));
        io.log.push(USAGE);
        self.shown_user = io.user.clone();
    }

    fn on_input(&mut self, line: &str, io: &mut AppIo<'_>) -> AppFlow {
        let line = line.trim();
        let (command, args) = line.split_once(' ').unwrap_or((line, ""));

        match command.to_ascii_lowercase().as_str() {
            "/quit" | "exit" => return AppFlow::Close,
            "/register" => match Self::credentials(args) {
                Some((name, password)) => match auth::register(io.store, name, password) {
                    Ok(()) => io.log.push(format!("[AUTH] Registered {name}")),
                    Err(e) => io.log.push(format!("[AUTH] Error: {e}")),
                },
                None => io.log.push("[AUTH] Usage: /register <name> <password>"),
            },
            "/login" => match Self::credentials(args) {
                Some((name, password)) if auth::verify(io.store, name, password) => {
                    log::info!("User {name} logged in");
                    *io.user = Some(name.to_string());
                    io.log.push(format!("[AUTH] Logged in as {name}"));
                }
                Some(_) => io.log.push("[AUTH] Login failed."),
                None => io.log.push("[AUTH] Usage: /login <name> <password>"),
            },
            "/logout" => match io.user.take() {
                Some(name) => io.log.push(format!("[AUTH] Logged out {name}")),
                None => io.log.push("[AUTH] Nobody is logged in."),
            },
            "/whoami" => {
                let name = io.user.as_deref().unwrap_or("guest");
                io.log.push(format!("[AUTH] {name}"));
            }
            "" => {}
            _ => io.log.push(USAGE),
        }

        self.shown_user = io.user.clone();
        AppFlow::Continue
    }

    fn widgets(&self) -> Vec<Widget> {
        let user = self.shown_user.as_deref().unwrap_or("guest");
        vec![
            Widget::label(Rect::new(0, 0, 40, 1), format!("USER: {user}")),
            Widget::button(Rect::new(0, 2, 10, 1), "[ WHOAMI ]", "/whoami"),
            Widget::button(Rect::new(11, 2, 10, 1), "[ LOGOUT ]", "/logout"),
            Widget::button(Rect::new(22, 2, 8, 1), "[ QUIT ]", "/quit"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_buffer::LogBuffer;
    use crate::storage::{FileStore, MemoryStore};
    use crate::widgets::hit_test;

    #[test]
    fn test_register_login_logout() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(20);
        let mut user = None;
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut user,
        };

        let mut app = Accounts::new();
        app.on_start(&mut io);
        app.on_input("/register ada lovelace", &mut io);
        app.on_input("/login ada wrong", &mut io);
        app.on_input("/login ada lovelace", &mut io);
        assert_eq!(app.widgets()[0].text(), "USER: ada");
        app.on_input("/whoami", &mut io);
        app.on_input("/logout", &mut io);
        app.on_input("/logout", &mut io);
        app.on_input("/whoami", &mut io);

        assert_eq!(user, None);
        assert_eq!(store.user_count(), 1);
        assert_eq!(
            log.lines(),
            [
                "USER ACCOUNTS",
                "0 user(s) registered.",
                USAGE,
                "[AUTH] Registered ada",
                "[AUTH] Login failed.",
                "[AUTH] Logged in as ada",
                "[AUTH] ada",
                "[AUTH] Logged out ada",
                "[AUTH] Nobody is logged in.",
                "[AUTH] guest",
            ]
        );
    }

    #[test]
    fn test_register_errors_are_logged() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(20);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };

        let mut app = Accounts::new();
        app.on_input("/register ada x", &mut io);
        app.on_input("/register ada y", &mut io);
        app.on_input("/register ada", &mut io);
        app.on_input("/login nobody x", &mut io);

        assert_eq!(
            log.lines(),
            [
                "[AUTH] Registered ada",
                "[AUTH] Error: user ada already exists",
                "[AUTH] Usage: /register <name> <password>",
                "[AUTH] Login failed.",
            ]
        );
    }

    #[test]
    fn test_buttons_and_quit() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(10);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };

        let mut app = Accounts::new();
        let widgets = app.widgets();
        assert_eq!(hit_test(&widgets, 3, 2).as_deref(), Some("/whoami"));
        assert_eq!(hit_test(&widgets, 10, 2), None);
        assert_eq!(hit_test(&widgets, 12, 2).as_deref(), Some("/logout"));
        assert_eq!(hit_test(&widgets, 25, 2).as_deref(), Some("/quit"));
        assert_eq!(hit_test(&widgets, 3, 0), None);
        assert_eq!(app.content_start(), 4);

        assert_eq!(app.on_input("EXIT", &mut io), AppFlow::Close);
        assert_eq!(app.on_input("/quit", &mut io), AppFlow::Close);
    }
}
