//! Readers and writers behind redirections, pipes and `getline`.
//!
//! Streams are cached under the literal string used to open them, so
//! `print > "f"` and a later `print >> "f"` share one handle until
//! `close("f")`. Pipes spawn `sh -c` once per key.
use crate::errors::EvaluationError;
use std::{
    cell::RefCell,
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{self, BufRead, BufReader, Read, Write},
    process::{Child, ChildStdout, Command, Stdio},
    rc::Rc,
};

/// Standard input, shareable between the main record loop and
/// `getline < "-"`.
pub type SharedStdin<'a> = Rc<RefCell<Box<dyn BufRead + 'a>>>;

enum InputKind<'a> {
    Stdin(SharedStdin<'a>),
    File(BufReader<File>),
    Child(BufReader<ChildStdout>, Child),
}

/// A rune-oriented reader with one character of pushback, enough for the
/// record-framing scans.
pub struct InputStream<'a> {
    kind: InputKind<'a>,
    pushback: Option<char>,
}

fn utf8_len(first: u8) -> usize {
    if first < 0x80 {
        1
    } else if first >> 5 == 0b110 {
        2
    } else if first >> 4 == 0b1110 {
        3
    } else {
        4
    }
}

fn read_rune(reader: &mut dyn Read) -> io::Result<Option<char>> {
    let mut first = [0u8; 1];
    if reader.read(&mut first)? == 0 {
        return Ok(None);
    }
    let len = utf8_len(first[0]);
    if len == 1 {
        return Ok(Some(char::from(first[0])));
    }
    let mut buf = [0u8; 4];
    buf[0] = first[0];
    let mut have = 1;
    while have < len {
        let n = reader.read(&mut buf[have..len])?;
        if n == 0 {
            break;
        }
        have += n;
    }
    match std::str::from_utf8(&buf[..have]) {
        Ok(s) => Ok(s.chars().next()),
        Err(_) => Ok(Some('\u{fffd}')),
    }
}

impl<'a> InputStream<'a> {
    pub fn stdin(stdin: &SharedStdin<'a>) -> InputStream<'a> {
        InputStream {
            kind: InputKind::Stdin(Rc::clone(stdin)),
            pushback: None,
        }
    }

    pub fn file(file: File) -> InputStream<'a> {
        InputStream {
            kind: InputKind::File(BufReader::new(file)),
            pushback: None,
        }
    }

    fn child(stdout: ChildStdout, child: Child) -> InputStream<'a> {
        InputStream {
            kind: InputKind::Child(BufReader::new(stdout), child),
            pushback: None,
        }
    }

    fn read_rune(&mut self) -> io::Result<Option<char>> {
        if let Some(c) = self.pushback.take() {
            return Ok(Some(c));
        }
        match &mut self.kind {
            InputKind::Stdin(shared) => read_rune(&mut *shared.borrow_mut()),
            InputKind::File(reader) => read_rune(reader),
            InputKind::Child(reader, ..) => read_rune(reader),
        }
    }

    fn unread(&mut self, c: char) {
        self.pushback = Some(c);
    }

    /// Paragraph mode skips the blank lines between records.
    pub fn skip_newlines(&mut self) -> io::Result<()> {
        loop {
            match self.read_rune()? {
                Some('\n') => continue,
                Some(c) => {
                    self.unread(c);
                    return Ok(());
                },
                None => return Ok(()),
            }
        }
    }

    /// Reads one record according to RS. `None` means the source was
    /// already exhausted; a partial record at EOF is still a record.
    pub fn read_record(&mut self, rs: &str) -> io::Result<Option<String>> {
        match rs.chars().next() {
            Some(sep) => self.read_record_sep(sep),
            None => self.read_record_paragraph(),
        }
    }

    fn read_record_sep(&mut self, sep: char) -> io::Result<Option<String>> {
        let mut record = String::new();
        let mut read_any = false;
        loop {
            match self.read_rune()? {
                None => {
                    return Ok(if read_any { Some(record) } else { None });
                },
                Some(c) => {
                    read_any = true;
                    if c == sep {
                        return Ok(Some(record));
                    }
                    record.push(c);
                },
            }
        }
    }

    /// Empty RS: records end at a blank line, single newlines stay inside
    /// the record.
    fn read_record_paragraph(&mut self) -> io::Result<Option<String>> {
        let mut record = String::new();
        let mut read_any = false;
        let mut held_newline = false;
        loop {
            match self.read_rune()? {
                None => {
                    return Ok(if read_any { Some(record) } else { None });
                },
                Some(c) => {
                    read_any = true;
                    if held_newline {
                        if c == '\n' {
                            return Ok(Some(record));
                        }
                        record.push('\n');
                        held_newline = false;
                    }
                    if c == '\n' {
                        held_newline = true;
                    } else {
                        record.push(c);
                    }
                },
            }
        }
    }
}

enum OutputKind {
    File(File),
    Pipe(Child),
}

pub struct Streams<'a> {
    stdin: SharedStdin<'a>,
    readers: HashMap<String, InputStream<'a>>,
    writers: HashMap<String, OutputKind>,
}

/// How a writer key is opened on first use.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteMode {
    Truncate,
    Append,
    Pipe,
}

impl<'a> Streams<'a> {
    pub fn new(stdin: Box<dyn BufRead + 'a>) -> Streams<'a> {
        Streams {
            stdin: Rc::new(RefCell::new(stdin)),
            readers: HashMap::new(),
            writers: HashMap::new(),
        }
    }

    /// Opens an input for the main record loop; `-` is standard input.
    pub fn open_main_input(&self, name: &str) -> Result<InputStream<'a>, EvaluationError> {
        if name == "-" {
            return Ok(InputStream::stdin(&self.stdin));
        }
        match File::open(name) {
            Ok(file) => Ok(InputStream::file(file)),
            Err(e) => Err(EvaluationError::BadFile(name.to_owned(), e.to_string())),
        }
    }

    /// The cached reader for `getline < key`. A file that cannot be opened
    /// reports as plain EOF-with-error to the caller, which maps it to -1.
    pub fn reader(&mut self, key: &str) -> Option<&mut InputStream<'a>> {
        if !self.readers.contains_key(key) {
            let stream = if key == "-" {
                InputStream::stdin(&self.stdin)
            } else {
                match File::open(key) {
                    Ok(file) => InputStream::file(file),
                    Err(_) => return None,
                }
            };
            self.readers.insert(key.to_owned(), stream);
        }
        self.readers.get_mut(key)
    }

    /// The cached reader for `key | getline`, spawning the command on
    /// first use.
    pub fn command_reader(
        &mut self,
        key: &str,
    ) -> Result<&mut InputStream<'a>, EvaluationError> {
        if !self.readers.contains_key(key) {
            let mut child = Command::new("sh")
                .arg("-c")
                .arg(key)
                .stdin(Stdio::inherit())
                .stdout(Stdio::piped())
                .spawn()
                .map_err(|e| EvaluationError::BadCommand(key.to_owned(), e.to_string()))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| {
                    EvaluationError::BadCommand(key.to_owned(), "no output".to_owned())
                })?;
            self.readers
                .insert(key.to_owned(), InputStream::child(stdout, child));
        }
        Ok(self.readers.get_mut(key).expect("reader just inserted"))
    }

    /// Writes through the cached writer for `key`, opening it on first
    /// use.
    pub fn write(&mut self, mode: WriteMode, key: &str, data: &str) -> Result<(), EvaluationError> {
        if !self.writers.contains_key(key) {
            let writer = match mode {
                WriteMode::Truncate | WriteMode::Append => {
                    let mut options = OpenOptions::new();
                    options.create(true).write(true);
                    if mode == WriteMode::Append {
                        options.append(true);
                    } else {
                        options.truncate(true);
                    }
                    match options.open(key) {
                        Ok(file) => OutputKind::File(file),
                        Err(e) => {
                            return Err(EvaluationError::BadFile(
                                key.to_owned(),
                                e.to_string(),
                            ));
                        },
                    }
                },
                WriteMode::Pipe => {
                    let child = Command::new("sh")
                        .arg("-c")
                        .arg(key)
                        .stdin(Stdio::piped())
                        .spawn()
                        .map_err(|e| {
                            EvaluationError::BadCommand(key.to_owned(), e.to_string())
                        })?;
                    OutputKind::Pipe(child)
                },
            };
            self.writers.insert(key.to_owned(), writer);
        }
        match self.writers.get_mut(key) {
            Some(OutputKind::File(file)) => file.write_all(data.as_bytes())?,
            Some(OutputKind::Pipe(child)) => match child.stdin.as_mut() {
                Some(stdin) => stdin.write_all(data.as_bytes())?,
                None => {},
            },
            None => {},
        }
        Ok(())
    }

    /// `close(key)`: drops the cached reader or writer. Pipes are reaped.
    pub fn close(&mut self, key: &str) {
        if let Some(writer) = self.writers.remove(key) {
            close_writer(writer);
        }
        if let Some(reader) = self.readers.remove(key) {
            if let InputKind::Child(reader, mut child) = reader.kind {
                drop(reader);
                let _ = child.wait();
            }
        }
    }

    /// Runs at exit: every writer is flushed, closed and reaped.
    pub fn close_all(&mut self) {
        for (_, writer) in self.writers.drain() {
            close_writer(writer);
        }
    }
}

fn close_writer(writer: OutputKind) {
    match writer {
        OutputKind::File(mut file) => {
            let _ = file.flush();
        },
        OutputKind::Pipe(mut child) => {
            drop(child.stdin.take());
            let _ = child.wait();
        },
    }
}
