use super::{AccessMode, CommandParser, CommandParserError, CommandTable};
use crate::reply::Reply;
use crate::store::Store;
use crate::Error;

pub(crate) fn register(table: &mut CommandTable) {
    table.register("PING", 1, AccessMode::Read, ping);
    table.register("FLUSHALL", 1, AccessMode::Admin, flushall);
}

/// Returns PONG if no argument is provided, otherwise return a copy of the argument.
///
/// Ref: <https://redis.io/docs/latest/commands/ping>
fn ping(_store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    let payload = match parser.next_bytes() {
        Ok(payload) => Some(payload),
        Err(CommandParserError::EndOfStream) => None,
        Err(e) => return Err(e.into()),
    };
    parser.finish()?;

    Ok(payload.map_or(Reply::Text("PONG".to_string()), Reply::Bytes))
}

/// Drops every key of every type.
fn flushall(store: &Store, parser: &mut CommandParser) -> Result<Reply, Error> {
    parser.finish()?;

    store.flush_all();

    Ok(Reply::ok())
}

#[cfg(test)]
mod tests {
    use crate::commands::tests::{bytes, run};
    use crate::reply::Reply;
    use crate::store::Store;

    #[test]
    fn ping() {
        let store = Store::new();

        assert_eq!(run(&store, &["PING"]), Reply::Text("PONG".to_string()));
        assert_eq!(run(&store, &["ping", "hello"]), bytes("hello"));
    }

    #[test]
    fn flushall_empties_every_type() {
        let store = Store::new();
        run(&store, &["SET", "k", "v"]);
        run(&store, &["RPUSH", "k", "a"]);
        run(&store, &["ZADD", "z", "1", "m"]);

        assert_eq!(run(&store, &["FLUSHALL"]), Reply::ok());

        assert_eq!(run(&store, &["GET", "k"]), Reply::Nil);
        assert_eq!(run(&store, &["LLEN", "k"]), Reply::Integer(0));
        assert_eq!(run(&store, &["ZCARD", "z"]), Reply::Integer(0));
    }
}
