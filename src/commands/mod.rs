pub mod hashes;
pub mod lists;
pub mod server;
pub mod sets;
pub mod sorted_sets;
pub mod strings;

use bytes::Bytes;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::{str, vec};
use strum_macros::{Display, EnumString};
use thiserror::Error as ThisError;
use tracing::{debug, error};

use crate::frame::Frame;
use crate::reply::Reply;
use crate::store::Store;
use crate::Error;

/// What a command does to the keyspace. Informational only, nothing is enforced with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
pub enum AccessMode {
    #[strum(to_string = "r")]
    Read,
    #[strum(to_string = "w")]
    Write,
    #[strum(to_string = "a")]
    Admin,
}

/// Executes a command against the store. Arguments are read from the parser, which is
/// positioned right after the command name.
pub type Handler = fn(&Store, &mut CommandParser) -> Result<Reply, Error>;

pub struct Command {
    pub name: &'static str,
    /// Minimum number of tokens, the command name included.
    pub arity: usize,
    pub access: AccessMode,
    pub handler: Handler,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .field("access", &self.access)
            .finish()
    }
}

/// Every command the server understands, keyed by upper-cased name.
///
/// The table is built once at startup and only read afterwards, so it can be shared between
/// connections without locking.
#[derive(Debug, Default)]
pub struct CommandTable {
    commands: HashMap<&'static str, Command>,
}

impl CommandTable {
    pub fn new() -> CommandTable {
        let mut table = CommandTable::default();

        strings::register(&mut table);
        hashes::register(&mut table);
        lists::register(&mut table);
        sets::register(&mut table);
        sorted_sets::register(&mut table);
        server::register(&mut table);

        table
    }

    /// Adds a command. Names must be upper case and unique, registering the same name twice is
    /// a programming error and panics.
    pub fn register(
        &mut self,
        name: &'static str,
        arity: usize,
        access: AccessMode,
        handler: Handler,
    ) {
        assert_eq!(name, name.to_uppercase(), "command names must be upper case");

        let command = Command {
            name,
            arity,
            access,
            handler,
        };
        if self.commands.insert(name, command).is_some() {
            panic!("command {} registered twice", name);
        }
    }

    /// Case-insensitive lookup.
    pub fn lookup(&self, name: &str) -> Option<&Command> {
        self.commands.get(name.to_uppercase().as_str())
    }

    /// Finds `name` and makes sure `argc` tokens (the name included) are enough to run it.
    pub fn check(&self, name: &str, argc: usize) -> Result<&Command, CommandError> {
        if name.trim().is_empty() {
            return Err(CommandError::EmptyCommand);
        }

        let command = self
            .lookup(name)
            .ok_or_else(|| CommandError::UnknownCommand {
                command: name.to_string(),
            })?;

        if argc < command.arity {
            return Err(CommandError::WrongArity {
                command: command.name.to_lowercase(),
            });
        }

        Ok(command)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Runs one request, given as the elements of the request array, and produces its reply.
    ///
    /// Lookup failures, handler errors and handler panics all turn into error replies, none of
    /// them ends the connection.
    pub fn dispatch(&self, store: &Store, parts: Vec<Frame>) -> Reply {
        let argc = parts.len();
        let mut parser = CommandParser::new(parts);

        let name = match parser.parse_command_name() {
            Ok(name) => name,
            Err(CommandParserError::EndOfStream) => String::new(),
            Err(err) => return Reply::error(err),
        };

        let command = match self.check(&name, argc) {
            Ok(command) => command,
            Err(err) => return Reply::error(err),
        };

        debug!(command = command.name, access = %command.access, argc, "dispatching command");

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            (command.handler)(store, &mut parser)
        }));

        match result {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => Reply::error(err),
            Err(_) => {
                error!(command = command.name, "command handler panicked");
                Reply::error(format!("internal error while running '{}'", name))
            }
        }
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandError {
    #[error("empty command")]
    EmptyCommand,
    #[error("unknown command '{command}'")]
    UnknownCommand { command: String },
    #[error("wrong number of arguments for '{command}' command")]
    WrongArity { command: String },
}

/// Cursor over the arguments of a request.
pub struct CommandParser {
    parts: vec::IntoIter<Frame>,
}

impl CommandParser {
    pub fn new(parts: Vec<Frame>) -> Self {
        Self {
            parts: parts.into_iter(),
        }
    }

    fn parse_command_name(&mut self) -> Result<String, CommandParserError> {
        self.next_string()
    }

    /// Number of arguments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.parts.len()
    }

    fn next_frame(&mut self) -> Result<Frame, CommandParserError> {
        self.parts.next().ok_or(CommandParserError::EndOfStream)
    }

    pub fn next_string(&mut self) -> Result<String, CommandParserError> {
        match self.next_frame()? {
            // Both `Simple` and `Bulk` representation may be strings. Strings are parsed to UTF-8.
            // While errors are stored as strings, they are considered separate types.
            Frame::Simple(s) => Ok(s),
            Frame::Bulk(bytes) => str::from_utf8(&bytes[..])
                .map(|s| s.to_string())
                .map_err(CommandParserError::InvalidUTF8String),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    pub fn next_bytes(&mut self) -> Result<Bytes, CommandParserError> {
        match self.next_frame()? {
            Frame::Simple(s) => Ok(Bytes::from(s)),
            Frame::Bulk(bytes) => Ok(bytes),
            frame => Err(CommandParserError::InvalidFrame {
                expected: "simple or bulk string".to_string(),
                actual: frame,
            }),
        }
    }

    pub fn next_integer(&mut self) -> Result<i64, CommandParserError> {
        match self.next_frame()? {
            Frame::Integer(i) => Ok(i),
            frame => frame
                .as_str()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(CommandParserError::InvalidInteger),
        }
    }

    /// Parses a float argument. `inf`, `+inf` and `-inf` are accepted, `NaN` is not.
    pub fn next_float(&mut self) -> Result<f64, CommandParserError> {
        match self.next_frame()? {
            Frame::Integer(i) => Ok(i as f64),
            frame => frame
                .as_str()
                .ok_or(CommandParserError::InvalidFloat)
                .and_then(parse_float),
        }
    }

    /// Consumes every remaining argument as a string.
    pub fn rest_strings(&mut self) -> Result<Vec<String>, CommandParserError> {
        let mut items = Vec::with_capacity(self.remaining());
        while self.remaining() > 0 {
            items.push(self.next_string()?);
        }
        Ok(items)
    }

    pub fn rest_bytes(&mut self) -> Result<Vec<Bytes>, CommandParserError> {
        let mut items = Vec::with_capacity(self.remaining());
        while self.remaining() > 0 {
            items.push(self.next_bytes()?);
        }
        Ok(items)
    }

    /// Consumes the remaining arguments as `name value` pairs.
    pub fn rest_pairs(&mut self) -> Result<Vec<(String, Bytes)>, CommandParserError> {
        if self.remaining() == 0 || self.remaining() % 2 != 0 {
            return Err(CommandParserError::UnbalancedPairs);
        }

        let mut pairs = Vec::with_capacity(self.remaining() / 2);
        while self.remaining() > 0 {
            pairs.push((self.next_string()?, self.next_bytes()?));
        }
        Ok(pairs)
    }

    /// Fails if there are arguments left over.
    pub fn finish(&mut self) -> Result<(), CommandParserError> {
        match self.parts.next() {
            None => Ok(()),
            Some(frame) => Err(CommandParserError::UnexpectedArgument { actual: frame }),
        }
    }
}

pub(crate) fn parse_float(s: &str) -> Result<f64, CommandParserError> {
    match s.parse::<f64>() {
        Ok(value) if !value.is_nan() => Ok(value),
        _ => Err(CommandParserError::InvalidFloat),
    }
}

#[derive(Debug, ThisError, PartialEq)]
pub enum CommandParserError {
    #[error("protocol error; invalid frame, expected {expected}, got {actual}")]
    InvalidFrame { expected: String, actual: Frame },
    #[error("protocol error; invalid UTF-8 string")]
    InvalidUTF8String(#[from] str::Utf8Error),
    #[error("value is not an integer or out of range")]
    InvalidInteger,
    #[error("value is not a valid float")]
    InvalidFloat,
    #[error("wrong number of arguments, expected name value pairs")]
    UnbalancedPairs,
    #[error("syntax error, unexpected argument {actual}")]
    UnexpectedArgument { actual: Frame },
    #[error("protocol error; attempting to extract a value failed due to the frame being fully consumed")]
    EndOfStream,
}
