//! Tokenizer and recursive-descent parser for command lines.
//!
//! ```text
//! line  := pipe ('&')* (';' line)?
//! pipe  := exec ('|' pipe)?
//! exec  := '(' line ')' redirs
//!        | redirs (word redirs)*
//! redirs := (('<' | '>' | '>>' | '>&' | '>c') word)*
//! ```
//!
//! Parsing works on spans into the line buffer. Once the whole line is
//! accepted, every word is NUL-terminated in place and the tree is handed
//! out as borrowed C strings.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::vec::Vec;
use core::ffi::CStr;
use core::fmt;

use konsoli_common::console::ConsoleId;
use konsoli_common::fcntl::OpenFlags;
use konsoli_common::param::{MAX_ARGS, MAX_REDIRECT_FD};
use konsoli_sdk::Fd;

use crate::text;

const WHITESPACE: &[u8] = b" \t\r\n\x0b";
const SYMBOLS: &[u8] = b"<|>&;()";

fn is_word_byte(c: u8) -> bool {
    !WHITESPACE.contains(&c) && !SYMBOLS.contains(&c)
}

/// How a file redirection opens its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectMode {
    /// `<`: read only.
    Read,
    /// `>` and `>>`: write only, created if missing. Neither truncates nor
    /// appends; writes start at offset 0.
    WriteCreate,
}

impl RedirectMode {
    /// Flags passed to `open`.
    pub fn flags(self) -> OpenFlags {
        match self {
            RedirectMode::Read => OpenFlags::RDONLY,
            RedirectMode::WriteCreate => OpenFlags::WRONLY | OpenFlags::CREATE,
        }
    }
}

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<W> {
    /// Run a program. No words means do nothing.
    Exec {
        /// Program name followed by its arguments.
        argv: Vec<W>,
    },
    /// Reopen `fd` on `path`, then run `inner`.
    Redirect {
        /// The redirected command.
        inner: Box<Command<W>>,
        /// File to open.
        path: W,
        /// How to open it.
        mode: RedirectMode,
        /// Descriptor that ends up referring to the file.
        fd: Fd,
    },
    /// Make `target` a copy of `source`, then run `inner`.
    RedirectFd {
        /// The redirected command.
        inner: Box<Command<W>>,
        /// Descriptor that is duplicated.
        source: Fd,
        /// Descriptor that is replaced.
        target: Fd,
    },
    /// `left | right`.
    Pipe {
        /// Writes into the pipe.
        left: Box<Command<W>>,
        /// Reads from the pipe.
        right: Box<Command<W>>,
    },
    /// `first ; second`.
    List {
        /// Runs to completion first.
        first: Box<Command<W>>,
        /// Runs afterwards.
        second: Box<Command<W>>,
    },
    /// `inner &`.
    Background {
        /// Runs without being waited for.
        inner: Box<Command<W>>,
    },
}

impl<W> Command<W> {
    fn for_each_word<F: FnMut(&W)>(&self, f: &mut F) {
        match self {
            Command::Exec { argv } => argv.iter().for_each(|word| f(word)),
            Command::Redirect { inner, path, .. } => {
                inner.for_each_word(f);
                f(path);
            }
            Command::RedirectFd { inner, .. } | Command::Background { inner } => {
                inner.for_each_word(f)
            }
            Command::Pipe { left, right } => {
                left.for_each_word(f);
                right.for_each_word(f);
            }
            Command::List { first, second } => {
                first.for_each_word(f);
                second.for_each_word(f);
            }
        }
    }

    fn try_map<T, E, F>(&self, f: &mut F) -> Result<Command<T>, E>
    where
        F: FnMut(&W) -> Result<T, E>,
    {
        Ok(match self {
            Command::Exec { argv } => Command::Exec {
                argv: argv.iter().map(&mut *f).collect::<Result<_, _>>()?,
            },
            Command::Redirect {
                inner,
                path,
                mode,
                fd,
            } => Command::Redirect {
                inner: Box::new(inner.try_map(f)?),
                path: f(path)?,
                mode: *mode,
                fd: *fd,
            },
            Command::RedirectFd {
                inner,
                source,
                target,
            } => Command::RedirectFd {
                inner: Box::new(inner.try_map(f)?),
                source: *source,
                target: *target,
            },
            Command::Pipe { left, right } => Command::Pipe {
                left: Box::new(left.try_map(f)?),
                right: Box::new(right.try_map(f)?),
            },
            Command::List { first, second } => Command::List {
                first: Box::new(first.try_map(f)?),
                second: Box::new(second.try_map(f)?),
            },
            Command::Background { inner } => Command::Background {
                inner: Box::new(inner.try_map(f)?),
            },
        })
    }

    // Binding strength when rendered: lower binds tighter.
    fn rank(&self) -> u8 {
        match self {
            Command::Exec { .. } | Command::Redirect { .. } | Command::RedirectFd { .. } => 0,
            Command::Pipe { .. } => 1,
            Command::Background { .. } => 2,
            Command::List { .. } => 3,
        }
    }
}

struct Operand<'t, 'a>(&'t Command<&'a CStr>, u8);

impl fmt::Display for Operand<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.rank() > self.1 {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Renders the tree back into a command line that parses to the same tree.
impl fmt::Display for Command<&CStr> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Exec { argv } => {
                for (i, word) in argv.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    f.write_str(text(word))?;
                }
                Ok(())
            }
            Command::Redirect {
                inner, path, mode, ..
            } => {
                let op = match mode {
                    RedirectMode::Read => "<",
                    RedirectMode::WriteCreate => ">",
                };
                write!(f, "{} {} {}", Operand(inner, 0), op, text(path))
            }
            Command::RedirectFd { inner, source, .. } => {
                write!(f, "{} >&{}", Operand(inner, 0), source)
            }
            Command::Pipe { left, right } => {
                write!(f, "{} | {}", Operand(left, 0), Operand(right, 1))
            }
            Command::List { first, second } => {
                write!(f, "{} ; {}", Operand(first, 2), second)
            }
            Command::Background { inner } => write!(f, "{} &", Operand(inner, 2)),
        }
    }
}

/// Why a command line was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Unexpected token.
    Syntax,
    /// `(` without its `)`.
    MissingParen,
    /// Redirection without a following word.
    MissingFile,
    /// Command with `MAX_ARGS` words or more.
    TooManyArgs,
    /// `>&` with a descriptor outside `0..MAX_REDIRECT_FD`.
    InvalidFd,
    /// `>c` with a console that does not exist.
    InvalidConsole,
    /// Input left over after a complete line.
    Leftovers(String),
    /// A word runs into the end of the buffer with no room to terminate it.
    LineTooLong,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax => write!(f, "syntax"),
            ParseError::MissingParen => write!(f, "syntax - missing )"),
            ParseError::MissingFile => write!(f, "missing file for redirection"),
            ParseError::TooManyArgs => write!(f, "too many args"),
            ParseError::InvalidFd => write!(f, "invalid redir fd"),
            ParseError::InvalidConsole => write!(f, "invalid console"),
            ParseError::Leftovers(rest) => write!(f, "leftovers: {}\nsyntax", rest),
            ParseError::LineTooLong => write!(f, "line too long"),
        }
    }
}

/// Parses the line in `buf`, which ends at the first NUL (or the end of
/// the buffer), and NUL-terminates every word in place.
pub fn parse(buf: &mut [u8]) -> Result<Command<&CStr>, ParseError> {
    let len = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
    let tree = Parser::new(&buf[..len]).parse()?;

    let mut overflow = false;
    tree.for_each_word(&mut |word: &Span| match buf.get_mut(word.end) {
        Some(c) => *c = 0,
        None => overflow = true,
    });
    if overflow {
        return Err(ParseError::LineTooLong);
    }

    let buf = &*buf;
    tree.try_map(&mut |word: &Span| {
        CStr::from_bytes_until_nul(&buf[word.start..]).map_err(|_| ParseError::LineTooLong)
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Span {
    start: usize,
    end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    End,
    Pipe,
    Open,
    Close,
    Semi,
    Amp,
    In,
    Out,
    Append,
    OutFd,
    OutConsole,
    Word(Span),
}

enum Redir {
    File {
        path: Span,
        mode: RedirectMode,
        fd: Fd,
    },
    Dup {
        source: Fd,
        target: Fd,
    },
}

/// Wraps `cmd` in `redirs`, the first one innermost.
fn wrap(cmd: Command<Span>, redirs: Vec<Redir>) -> Command<Span> {
    redirs.into_iter().fold(cmd, |inner, redir| match redir {
        Redir::File { path, mode, fd } => Command::Redirect {
            inner: Box::new(inner),
            path,
            mode,
            fd,
        },
        Redir::Dup { source, target } => Command::RedirectFd {
            inner: Box::new(inner),
            source,
            target,
        },
    })
}

struct Parser<'a> {
    line: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(line: &'a [u8]) -> Self {
        Self { line, pos: 0 }
    }

    fn parse(mut self) -> Result<Command<Span>, ParseError> {
        let cmd = self.parse_line()?;
        self.skip_whitespace();
        if self.pos != self.line.len() {
            let rest = String::from_utf8_lossy(&self.line[self.pos..]);
            return Err(ParseError::Leftovers(rest.trim_end().into()));
        }
        Ok(cmd)
    }

    fn at(&self, offset: usize) -> Option<u8> {
        self.line.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.at(0).is_some_and(|c| WHITESPACE.contains(&c)) {
            self.pos += 1;
        }
    }

    /// Whether the next token starts with one of `symbols`.
    fn peek(&mut self, symbols: &[u8]) -> bool {
        self.skip_whitespace();
        self.at(0).is_some_and(|c| symbols.contains(&c))
    }

    fn next_token(&mut self) -> Token {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.at(0) else {
            return Token::End;
        };
        self.pos += 1;
        match c {
            b'|' => Token::Pipe,
            b'(' => Token::Open,
            b')' => Token::Close,
            b';' => Token::Semi,
            b'&' => Token::Amp,
            b'<' => Token::In,
            b'>' => match self.at(0) {
                Some(b'>') => {
                    self.pos += 1;
                    Token::Append
                }
                Some(b'&') => {
                    self.pos += 1;
                    Token::OutFd
                }
                // `>cat` is a file named `cat`; `>c` before anything else is a console.
                Some(b'c')
                    if !self
                        .at(1)
                        .is_some_and(|d| is_word_byte(d) && !d.is_ascii_digit()) =>
                {
                    self.pos += 1;
                    Token::OutConsole
                }
                _ => Token::Out,
            },
            _ => {
                while self.at(0).is_some_and(is_word_byte) {
                    self.pos += 1;
                }
                Token::Word(Span {
                    start,
                    end: self.pos,
                })
            }
        }
    }

    /// Leading decimal digits of `word`.
    fn number(&self, word: Span) -> Option<i32> {
        let word = &self.line[word.start..word.end];
        let len = word.iter().take_while(|c| c.is_ascii_digit()).count();
        if len == 0 {
            return None;
        }
        word[..len]
            .iter()
            .try_fold(0i32, |n, &d| n.checked_mul(10)?.checked_add(i32::from(d - b'0')))
    }

    fn parse_line(&mut self) -> Result<Command<Span>, ParseError> {
        let mut cmd = self.parse_pipe()?;
        while self.peek(b"&") {
            self.next_token();
            cmd = Command::Background {
                inner: Box::new(cmd),
            };
        }
        if self.peek(b";") {
            self.next_token();
            cmd = Command::List {
                first: Box::new(cmd),
                second: Box::new(self.parse_line()?),
            };
        }
        Ok(cmd)
    }

    fn parse_pipe(&mut self) -> Result<Command<Span>, ParseError> {
        let cmd = self.parse_exec()?;
        if self.peek(b"|") {
            self.next_token();
            return Ok(Command::Pipe {
                left: Box::new(cmd),
                right: Box::new(self.parse_pipe()?),
            });
        }
        Ok(cmd)
    }

    fn parse_block(&mut self) -> Result<Command<Span>, ParseError> {
        self.next_token();
        let cmd = self.parse_line()?;
        if !self.peek(b")") {
            return Err(ParseError::MissingParen);
        }
        self.next_token();
        let mut redirs = Vec::new();
        self.parse_redirs(&mut redirs)?;
        Ok(wrap(cmd, redirs))
    }

    fn parse_exec(&mut self) -> Result<Command<Span>, ParseError> {
        if self.peek(b"(") {
            return self.parse_block();
        }
        let mut argv = Vec::new();
        let mut redirs = Vec::new();
        self.parse_redirs(&mut redirs)?;
        while !self.peek(b"|)&;") {
            match self.next_token() {
                Token::End => break,
                Token::Word(word) => argv.push(word),
                _ => return Err(ParseError::Syntax),
            }
            if argv.len() >= MAX_ARGS {
                return Err(ParseError::TooManyArgs);
            }
            self.parse_redirs(&mut redirs)?;
        }
        Ok(wrap(Command::Exec { argv }, redirs))
    }

    fn parse_redirs(&mut self, redirs: &mut Vec<Redir>) -> Result<(), ParseError> {
        while self.peek(b"<>") {
            let op = self.next_token();
            let Token::Word(arg) = self.next_token() else {
                return Err(ParseError::MissingFile);
            };
            let redir = match op {
                Token::In => Redir::File {
                    path: arg,
                    mode: RedirectMode::Read,
                    fd: 0,
                },
                Token::Out | Token::Append => Redir::File {
                    path: arg,
                    mode: RedirectMode::WriteCreate,
                    fd: 1,
                },
                Token::OutFd => {
                    let source = self
                        .number(arg)
                        .filter(|fd| (0..MAX_REDIRECT_FD).contains(fd))
                        .ok_or(ParseError::InvalidFd)?;
                    Redir::Dup { source, target: 1 }
                }
                Token::OutConsole => {
                    let console = self
                        .number(arg)
                        .and_then(|n| ConsoleId::new(n as usize))
                        .ok_or(ParseError::InvalidConsole)?;
                    Redir::Dup {
                        source: console.fd(),
                        target: 1,
                    }
                }
                _ => return Err(ParseError::Syntax),
            };
            redirs.push(redir);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec<'a>(argv: &[&'a CStr]) -> Command<&'a CStr> {
        Command::Exec {
            argv: argv.to_vec(),
        }
    }

    fn parse_str(line: &str) -> Result<String, ParseError> {
        let mut buf = line.as_bytes().to_vec();
        buf.push(0);
        parse(&mut buf).map(|cmd| cmd.to_string())
    }

    #[test]
    fn test_file_redirect() {
        let mut buf = *b"echo hi > out.txt\n\0";
        let cmd = parse(&mut buf).unwrap();
        assert_eq!(
            cmd,
            Command::Redirect {
                inner: Box::new(exec(&[c"echo", c"hi"])),
                path: c"out.txt",
                mode: RedirectMode::WriteCreate,
                fd: 1,
            }
        );
    }

    #[test]
    fn test_pipe_is_right_associative() {
        let mut buf = *b"a | b | c\n\0";
        let cmd = parse(&mut buf).unwrap();
        assert_eq!(
            cmd,
            Command::Pipe {
                left: Box::new(exec(&[c"a"])),
                right: Box::new(Command::Pipe {
                    left: Box::new(exec(&[c"b"])),
                    right: Box::new(exec(&[c"c"])),
                }),
            }
        );
    }

    #[test]
    fn test_words_are_terminated_in_place() {
        let mut buf = *b"ls|wc\n\0";
        let cmd = parse(&mut buf).unwrap();
        let Command::Pipe { left, right } = &cmd else {
            panic!("not a pipe: {cmd:?}");
        };
        assert_eq!(**left, exec(&[c"ls"]));
        assert_eq!(**right, exec(&[c"wc"]));
        drop(cmd);
        assert_eq!(&buf, b"ls\0wc\0\0");
    }

    #[test]
    fn test_precedence() {
        let mut buf = *b"a | b & ; c\0";
        let cmd = parse(&mut buf).unwrap();
        assert_eq!(
            cmd,
            Command::List {
                first: Box::new(Command::Background {
                    inner: Box::new(Command::Pipe {
                        left: Box::new(exec(&[c"a"])),
                        right: Box::new(exec(&[c"b"])),
                    }),
                }),
                second: Box::new(exec(&[c"c"])),
            }
        );
    }

    #[test]
    fn test_redirects_anywhere_wrap_in_order() {
        let mut buf = *b"< in sort -r > out\0";
        let cmd = parse(&mut buf).unwrap();
        assert_eq!(
            cmd,
            Command::Redirect {
                inner: Box::new(Command::Redirect {
                    inner: Box::new(exec(&[c"sort", c"-r"])),
                    path: c"in",
                    mode: RedirectMode::Read,
                    fd: 0,
                }),
                path: c"out",
                mode: RedirectMode::WriteCreate,
                fd: 1,
            }
        );
    }

    #[test]
    fn test_block_takes_redirects() {
        let mut buf = *b"(a ; b) >> log\0";
        let cmd = parse(&mut buf).unwrap();
        assert_eq!(
            cmd,
            Command::Redirect {
                inner: Box::new(Command::List {
                    first: Box::new(exec(&[c"a"])),
                    second: Box::new(exec(&[c"b"])),
                }),
                path: c"log",
                mode: RedirectMode::WriteCreate,
                fd: 1,
            }
        );
    }

    #[test]
    fn test_descriptor_and_console_redirects() {
        let mut buf = *b"ls >&2 >c1\0";
        let cmd = parse(&mut buf).unwrap();
        assert_eq!(
            cmd,
            Command::RedirectFd {
                inner: Box::new(Command::RedirectFd {
                    inner: Box::new(exec(&[c"ls"])),
                    source: 2,
                    target: 1,
                }),
                source: ConsoleId::new(1).unwrap().fd(),
                target: 1,
            }
        );
    }

    #[test]
    fn test_c_without_digit_is_a_file() {
        let mut buf = *b"ls >cat\0";
        let cmd = parse(&mut buf).unwrap();
        assert_eq!(
            cmd,
            Command::Redirect {
                inner: Box::new(exec(&[c"ls"])),
                path: c"cat",
                mode: RedirectMode::WriteCreate,
                fd: 1,
            }
        );
    }

    #[test]
    fn test_console_number_may_be_a_separate_word() {
        assert_eq!(parse_str("ls >c 1"), parse_str("ls >c1"));
        assert_eq!(parse_str("ls >c\t2;x"), parse_str("ls >c2 ; x"));
        assert_eq!(parse_str("ls >c 1").unwrap(), "ls >&4");
    }

    #[test]
    fn test_render_round_trip() {
        for line in [
            "a | b > f",
            "(a ; b) | c",
            "a & ; b",
            "(a | b) > f",
            "x < in >&2",
            "(a ; b) &",
        ] {
            let rendered = parse_str(line).unwrap();
            assert_eq!(parse_str(&rendered).unwrap(), rendered, "{line}");
        }
        assert_eq!(parse_str("a|b>f").unwrap(), "a | b > f");
        assert_eq!(parse_str("ls >c3").unwrap(), "ls >&6");
    }

    #[test]
    fn test_empty_line_is_empty_exec() {
        let mut buf = *b"   \n\0";
        assert_eq!(parse(&mut buf), Ok(exec(&[])));
    }

    #[test]
    fn test_errors() {
        let cases = [
            ("a b c d e f g h i j", ParseError::TooManyArgs),
            ("ls >&10", ParseError::InvalidFd),
            ("ls >&x", ParseError::InvalidFd),
            ("ls >c4", ParseError::InvalidConsole),
            ("ls >c", ParseError::MissingFile),
            ("ls >c |", ParseError::MissingFile),
            ("ls >c x", ParseError::InvalidConsole),
            ("ls >", ParseError::MissingFile),
            ("ls > |", ParseError::MissingFile),
            ("(a | b", ParseError::MissingParen),
            ("a (b)", ParseError::Syntax),
            ("a )", ParseError::Leftovers(")".into())),
        ];
        for (line, err) in cases {
            assert_eq!(parse_str(line), Err(err), "{line}");
        }
        assert!(parse_str("a b c d e f g h i").is_ok());
    }

    #[test]
    fn test_leading_digits() {
        assert_eq!(parse_str("ls >&3rd").unwrap(), "ls >&3");
        assert_eq!(parse_str("ls >c2x").unwrap(), "ls >&5");
    }

    #[test]
    fn test_word_without_room_for_terminator() {
        let mut buf = *b"ls -l";
        assert_eq!(parse(&mut buf), Err(ParseError::LineTooLong));
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(ParseError::MissingParen.to_string(), "syntax - missing )");
        assert_eq!(
            ParseError::Leftovers(")".into()).to_string(),
            "leftovers: )\nsyntax"
        );
    }
}
