use core::fmt;

use jsonlike::JsonLike;

use crate::{
    error::EncodeError,
    node::{Elements, NamedPairs, Node},
    pool::Pools,
    store::Value,
    writer::AppendWriter,
};

const HEX: &[u8; 16] = b"0123456789abcdef";

enum Members<'s> {
    Elements(Elements<'s>),
    Pairs(NamedPairs<'s>),
}

/// A container whose opening bracket was written.
struct Open<'s> {
    members: Members<'s>,
    first: bool,
}

/// Write the compact encoding of `node` without recursion.
pub(crate) fn write_node(writer: &mut AppendWriter, node: Node<'_>) -> Result<(), EncodeError> {
    let mut stack = Vec::new();
    write_value(writer, node, &mut stack)?;
    while let Some(open) = stack.last_mut() {
        let next = match &mut open.members {
            Members::Elements(elements) => elements.next().map(|child| (None, child)),
            Members::Pairs(pairs) => pairs.next().map(|(key, child)| (Some(key), child)),
        };
        if let Some((key, child)) = next {
            if !open.first {
                writer.push(b',')?;
            }
            open.first = false;
            if let Some(key) = key {
                write_str(writer, key)?;
                writer.push(b':')?;
            }
            write_value(writer, child, &mut stack)?;
        } else {
            let close = match open.members {
                Members::Elements(_) => b']',
                Members::Pairs(_) => b'}',
            };
            writer.push(close)?;
            stack.pop();
        }
    }
    Ok(())
}

fn write_value<'s>(
    writer: &mut AppendWriter,
    node: Node<'s>,
    stack: &mut Vec<Open<'s>>,
) -> Result<(), EncodeError> {
    match node.value() {
        Value::Null => writer.write(b"null"),
        Value::Bool(true) => writer.write(b"true"),
        Value::Bool(false) => writer.write(b"false"),
        Value::Number(number) => writer.write(number.as_str().as_bytes()),
        Value::String(text) => write_str(writer, text),
        Value::Array => {
            writer.push(b'[')?;
            match node.elements() {
                Some(elements) => {
                    stack.push(Open {
                        members: Members::Elements(elements),
                        first: true,
                    });
                    Ok(())
                }
                None => writer.push(b']'),
            }
        }
        Value::Object => {
            writer.push(b'{')?;
            match JsonLike::pairs(node) {
                Some(pairs) => {
                    stack.push(Open {
                        members: Members::Pairs(pairs),
                        first: true,
                    });
                    Ok(())
                }
                None => writer.push(b'}'),
            }
        }
    }
}

/// Write `text` as a JSON string literal.
pub(crate) fn write_str(writer: &mut AppendWriter, text: &str) -> Result<(), EncodeError> {
    writer.push(b'"')?;
    let bytes = text.as_bytes();
    let mut start = 0;
    let mut unicode = *b"\\u0000";
    for (index, &byte) in bytes.iter().enumerate() {
        let escape: &[u8] = match byte {
            b'"' => b"\\\"",
            b'\\' => b"\\\\",
            b'\n' => b"\\n",
            b'\r' => b"\\r",
            b'\t' => b"\\t",
            0x08 => b"\\b",
            0x0c => b"\\f",
            0x00..=0x1f => {
                unicode[4] = HEX[usize::from(byte >> 4)];
                unicode[5] = HEX[usize::from(byte & 0xf)];
                &unicode
            }
            _ => continue,
        };
        writer.write(&bytes[start..index])?;
        writer.write(escape)?;
        start = index + 1;
    }
    writer.write(&bytes[start..])?;
    writer.push(b'"')
}

pub(crate) fn display(node: Node<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut writer = Pools::global().writers().scoped();
    write_node(&mut writer, node).map_err(|_| fmt::Error)?;
    f.write_str(std::str::from_utf8(writer.bytes()).map_err(|_| fmt::Error)?)
}
