//! Partial JSON repair for snapshot streaming.
//!
//! Snapshot-style vendors stream a JSON document a few bytes at a time. To
//! show progress before the document is complete, [`repair_prefix`] finds the
//! last point where the prefix is structurally complete, drops everything
//! after it, and closes the containers still open.
//!
//! A cut never lands inside a string or after a scalar that is not yet
//! followed by a delimiter, so a repaired value never contains a truncated
//! string or number. `{"name":"Ad` repairs to `{}`, not `{"name":"Ad"}`.
//! Likewise an array element that is itself a container is only kept once
//! it closes: `[{"v":1},{"v` repairs to `[{"v":1}]`, not `[{"v":1},{}]`.

use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Frame {
    Object { expect_key: bool },
    Array,
}

impl Frame {
    fn closer(self) -> char {
        match self {
            Self::Object { .. } => '}',
            Self::Array => ']',
        }
    }
}

/// A position where the prefix can be cut, plus what it takes to close it.
struct Cut {
    at: usize,
    closers: String,
}

fn closers(stack: &[Frame]) -> String {
    stack.iter().rev().map(|f| f.closer()).collect()
}

/// Repair the longest structurally complete prefix of `buffer` and parse it.
///
/// Returns `None` when no container has been opened yet or the repaired
/// text still does not parse.
pub fn repair_prefix(buffer: &str) -> Option<Value> {
    let bytes = buffer.as_bytes();
    let mut stack: Vec<Frame> = Vec::new();
    let mut in_string = false;
    let mut string_is_key = false;
    let mut escaped = false;
    let mut last: Option<Cut> = None;
    // Stack depth of the outermost unfinished container element of an array.
    // No cut is taken while inside it.
    let mut open_element: Option<usize> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
                if !string_is_key && !stack.is_empty() && open_element.is_none() {
                    last = Some(Cut {
                        at: i + 1,
                        closers: closers(&stack),
                    });
                }
            }
            continue;
        }

        match b {
            b'{' | b'[' => {
                let in_array = stack.last() == Some(&Frame::Array);
                stack.push(if b == b'{' {
                    Frame::Object { expect_key: true }
                } else {
                    Frame::Array
                });
                if open_element.is_none() {
                    if in_array {
                        open_element = Some(stack.len());
                    } else {
                        last = Some(Cut {
                            at: i + 1,
                            closers: closers(&stack),
                        });
                    }
                }
            }
            b'}' | b']' => {
                let _ = stack.pop();
                if open_element.is_some_and(|depth| stack.len() < depth) {
                    open_element = None;
                }
                if open_element.is_none() {
                    last = Some(Cut {
                        at: i + 1,
                        closers: closers(&stack),
                    });
                }
                if stack.is_empty() {
                    break;
                }
            }
            b'"' => {
                in_string = true;
                string_is_key = matches!(stack.last(), Some(Frame::Object { expect_key: true }));
            }
            b':' => {
                if let Some(Frame::Object { expect_key }) = stack.last_mut() {
                    *expect_key = false;
                }
            }
            b',' => {
                if open_element.is_none() {
                    last = Some(Cut {
                        at: i,
                        closers: closers(&stack),
                    });
                }
                if let Some(Frame::Object { expect_key }) = stack.last_mut() {
                    *expect_key = true;
                }
            }
            _ => {}
        }
    }

    let cut = last?;
    let mut repaired = String::with_capacity(cut.at + cut.closers.len());
    repaired.push_str(&buffer[..cut.at]);
    repaired.push_str(&cut.closers);
    serde_json::from_str(&repaired).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
