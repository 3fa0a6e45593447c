use super::{App, AppFlow, AppIo};
use crate::widgets::{Rect, Widget};

/// Line-oriented notes editor backed by the file store
#[derive(Debug, Default)]
pub struct Notes {
    content: Vec<String>,
}

impl Notes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content(&self) -> &[String] {
        &self.content
    }

    fn save(&self, name: &str, io: &mut AppIo<'_>) {
        if io.store.write_file(name, &self.content.join("\n")) {
            io.log.push(format!("Saved to {name}"));
        } else {
            io.log.push("Error saving file.");
        }
    }

    fn load(&mut self, name: &str, io: &mut AppIo<'_>) {
        match io.store.read_file(name) {
            Some(data) => {
                self.content = data.split('\n').map(str::to_string).collect();
                io.log.push(format!("Loaded {name}"));
            }
            None => io.log.push("File not found."),
        }
    }
}

impl App for Notes {
    fn title(&self) -> &str {
        "Notes"
    }

    fn on_start(&mut self, io: &mut AppIo<'_>) {
        io.log.push("NOTES EDITOR");
        io.log.push("Type to write. Commands: /save <name>, /load <name>, /clear, /quit");
    }

    fn on_input(&mut self, line: &str, io: &mut AppIo<'_>) -> AppFlow {
        let cmd = line.trim();
        let (verb, arg) = match cmd.split_once(' ') {
            Some((verb, arg)) => (verb, arg.trim()),
            None => (cmd, ""),
        };

        match verb {
            "/quit" => return AppFlow::Close,
            "/clear" => {
                self.content.clear();
                io.log.push("Cleared.");
            }
            "/save" | "/load" if arg.is_empty() => {
                io.log.push(format!("Usage: {verb} <filename>"));
            }
            "/save" => self.save(arg, io),
            "/load" => self.load(arg, io),
            _ => self.content.push(line.to_string()),
        }
        AppFlow::Continue
    }

    fn widgets(&self) -> Vec<Widget> {
        let mut widgets = vec![
            Widget::button(Rect::new(0, 0, 8, 1), "[ CLEAR ]", "/clear"),
            Widget::button(Rect::new(10, 0, 7, 1), "[ QUIT ]", "/quit"),
        ];

        for (row, text) in self.content.iter().enumerate() {
            widgets.push(Widget::label(Rect::new(0, 2 + row as u16, 60, 1), text.clone()));
        }
        widgets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::log_buffer::LogBuffer;
    use crate::storage::{FileStore, MemoryStore};

    #[test]
    fn test_save_and_load() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(10);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };

        let mut notes = Notes::new();
        notes.on_input("buy milk", &mut io);
        notes.on_input("call bob", &mut io);
        notes.on_input("/save todo.txt", &mut io);
        assert_eq!(io.log.last(), Some("Saved to todo.txt"));

        notes.on_input("/clear", &mut io);
        assert!(notes.content().is_empty());

        notes.on_input("/load todo.txt", &mut io);
        assert_eq!(notes.content(), ["buy milk", "call bob"]);
        assert_eq!(store.read_file("todo.txt").as_deref(), Some("buy milk\ncall bob"));
    }

    #[test]
    fn test_usage_and_missing_file() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(10);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };

        let mut notes = Notes::new();
        notes.on_input("/save", &mut io);
        assert_eq!(io.log.last(), Some("Usage: /save <filename>"));

        notes.on_input("/load nope.txt", &mut io);
        assert_eq!(io.log.last(), Some("File not found."));
        assert_eq!(notes.on_input("/quit", &mut io), AppFlow::Close);
    }

    #[test]
    fn test_widgets_show_content() {
        let store = MemoryStore::new();
        let mut log = LogBuffer::new(10);
        let mut io = AppIo {
            log: &mut log,
            store: &store,
            user: &mut None,
        };

        let mut notes = Notes::new();
        notes.on_input("first line", &mut io);
        let widgets = notes.widgets();
        assert_eq!(widgets.len(), 3);
        assert_eq!(widgets[2].text(), "first line");
        assert_eq!(notes.content_start(), 4);
    }
}
