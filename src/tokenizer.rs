//! Line tokenizer and lazy record stream.
//!
//! [`Tokenizer::tokenize`] splits one line into raw fields. [`Records`] drives it over a
//! [`BufRead`] source one line at a time.

use std::io::{self, BufRead, Seek, SeekFrom};
use std::mem;

use crate::error::{AggregateError, AggregateResult, MalformedRow};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Delimiter/quote configuration for the [`Tokenizer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
    /// Field separator.
    pub delimiter: char,
    /// Quote character; doubled inside a quoted field it stands for itself.
    pub quote: char,
    /// Drop whitespace outside quotes instead of keeping it verbatim.
    pub trim: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote: '"',
            trim: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    FieldStart,
    Unquoted,
    Quoted,
    QuoteInQuoted,
    AfterQuoted,
}

/// Splits single lines into raw field strings.
#[derive(Debug, Clone, Copy)]
pub struct Tokenizer {
    opts: TokenizerOptions,
}

impl Tokenizer {
    /// Create a tokenizer, validating the delimiter/quote pair.
    pub fn new(opts: TokenizerOptions) -> AggregateResult<Self> {
        if opts.delimiter == opts.quote {
            return Err(AggregateError::InvalidOptions {
                message: format!(
                    "delimiter and quote must differ (both are {:?})",
                    opts.delimiter
                ),
            });
        }
        for (what, ch) in [("delimiter", opts.delimiter), ("quote", opts.quote)] {
            if ch == '\n' || ch == '\r' {
                return Err(AggregateError::InvalidOptions {
                    message: format!("{what} cannot be a line terminator"),
                });
            }
        }
        Ok(Self { opts })
    }

    /// The options this tokenizer was built with.
    pub fn options(&self) -> TokenizerOptions {
        self.opts
    }

    /// Split `line` into fields.
    ///
    /// A trailing `\r` is ignored. A quote character only opens a quoted section at the start of
    /// a field (after optional whitespace when trimming); elsewhere it is literal.
    pub fn tokenize(&self, line: &str) -> Result<Vec<String>, MalformedRow> {
        let line = line.strip_suffix('\r').unwrap_or(line);
        let TokenizerOptions {
            delimiter,
            quote,
            trim,
        } = self.opts;

        let mut fields = Vec::new();
        let mut field = String::new();
        let mut state = State::FieldStart;
        let mut quote_offset = 0;

        for (offset, ch) in line.char_indices() {
            state = match state {
                State::FieldStart if ch == delimiter => {
                    fields.push(mem::take(&mut field));
                    State::FieldStart
                }
                State::FieldStart if ch == quote => {
                    quote_offset = offset;
                    field.clear();
                    State::Quoted
                }
                State::FieldStart if trim && ch.is_whitespace() => State::FieldStart,
                State::FieldStart | State::Unquoted => {
                    if ch == delimiter {
                        fields.push(self.finish_unquoted(mem::take(&mut field)));
                        State::FieldStart
                    } else {
                        field.push(ch);
                        State::Unquoted
                    }
                }
                State::Quoted => {
                    if ch == quote {
                        State::QuoteInQuoted
                    } else {
                        field.push(ch);
                        State::Quoted
                    }
                }
                State::QuoteInQuoted if ch == quote => {
                    field.push(quote);
                    State::Quoted
                }
                State::QuoteInQuoted | State::AfterQuoted => {
                    if ch == delimiter {
                        fields.push(mem::take(&mut field));
                        State::FieldStart
                    } else {
                        if !(trim && ch.is_whitespace()) {
                            field.push(ch);
                        }
                        State::AfterQuoted
                    }
                }
            };
        }

        match state {
            State::Quoted => Err(MalformedRow::UnterminatedQuote {
                offset: quote_offset,
            }),
            State::Unquoted | State::FieldStart => {
                fields.push(self.finish_unquoted(field));
                Ok(fields)
            }
            State::QuoteInQuoted | State::AfterQuoted => {
                fields.push(field);
                Ok(fields)
            }
        }
    }

    fn finish_unquoted(&self, field: String) -> String {
        if self.opts.trim {
            field.trim_end().to_owned()
        } else {
            field
        }
    }
}

/// One non-empty line read from a [`Records`] stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based physical line number.
    pub line: usize,
    /// Tokenized fields, or the reason the line could not be split.
    pub fields: Result<Vec<String>, MalformedRow>,
}

/// Lazy, finite stream of tokenized lines.
///
/// Completely empty lines are skipped (their line numbers are still counted). A UTF-8 byte-order
/// mark at the start of the source is dropped; a line that is not valid UTF-8 yields
/// [`MalformedRow::InvalidUtf8`] and the stream goes on. The stream is
/// single-pass over a plain reader; over a seekable source it can be restarted with
/// [`Records::rewind`].
#[derive(Debug)]
pub struct Records<R> {
    reader: R,
    tokenizer: Tokenizer,
    buf: Vec<u8>,
    line: usize,
    done: bool,
}

impl<R: BufRead> Records<R> {
    /// Wrap `reader`, splitting each line with `tokenizer`.
    pub fn new(reader: R, tokenizer: Tokenizer) -> Self {
        Self {
            reader,
            tokenizer,
            buf: Vec::new(),
            line: 0,
            done: false,
        }
    }

    /// Number of physical lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }

    /// Consume the stream, returning the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: BufRead + Seek> Records<R> {
    /// Restart the stream from the beginning of the source.
    pub fn rewind(&mut self) -> io::Result<()> {
        self.reader.seek(SeekFrom::Start(0))?;
        self.line = 0;
        self.done = false;
        Ok(())
    }
}

impl<R: BufRead> Iterator for Records<R> {
    type Item = AggregateResult<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line += 1;
                    let bytes = self.buf.strip_suffix(b"\n").unwrap_or(&self.buf);
                    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
                    // Byte-order mark written by spreadsheet exports.
                    let bytes = match self.line {
                        1 => bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes),
                        _ => bytes,
                    };
                    if bytes.is_empty() {
                        continue;
                    }
                    let fields = match std::str::from_utf8(bytes) {
                        Ok(text) => self.tokenizer.tokenize(text),
                        Err(e) => Err(MalformedRow::InvalidUtf8 {
                            offset: e.valid_up_to(),
                        }),
                    };
                    return Some(Ok(Record {
                        line: self.line,
                        fields,
                    }));
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(AggregateError::Io(e)));
                }
            }
        }
        None
    }
}
