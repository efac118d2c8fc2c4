//! Lazy record decoding and encoding over any byte source.
//!
//! A decoder validates the file header on construction, then yields one
//! record per `next()` call. It holds exactly one record's worth of bytes
//! and never seeks, so it works on files, pipes, and in-memory buffers alike.

use std::io::{self, Read, Write};
use std::iter::FusedIterator;
use std::marker::PhantomData;

use contango_core::{
    DecoderConfig, DepthRecord, Error, MarketRecord, OrderingMode, RecordKind, Result, ScDateTime,
    TradeRecord,
};
use tracing::{debug, warn};

use crate::format::{Depth, FileHeader, Intraday, RecordLayout};

/// Decoder over intraday trade records.
pub type TradeDecoder<R> = Decoder<R, Intraday>;

/// Decoder over market depth records.
pub type DepthDecoder<R> = Decoder<R, Depth>;

/// Forward-only decoder for one file.
///
/// Iteration stops for good after the first error.
pub struct Decoder<R, L: RecordLayout> {
    reader: R,
    config: DecoderConfig,
    header: FileHeader,
    buf: Vec<u8>,
    /// Records consumed so far, including those skipped by the checkpoint.
    position: u64,
    /// Records decoded by this instance.
    decoded: u64,
    suspect: u64,
    /// Highest timestamp seen.
    watermark: Option<ScDateTime>,
    done: bool,
    _layout: PhantomData<L>,
}

/// Fill `buf` from `reader`, stopping early only at end of input.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Read and drop `len` bytes, returning how many were available.
fn skip_bytes<R: Read>(reader: &mut R, len: u64) -> io::Result<u64> {
    io::copy(&mut reader.by_ref().take(len), &mut io::sink())
}

impl<R: Read, L: RecordLayout> Decoder<R, L> {
    /// Validate the header and position the cursor at the first record to
    /// decode (after `config.checkpoint` records).
    pub fn new(mut reader: R, config: DecoderConfig) -> Result<Self> {
        config.validate()?;

        let mut head = vec![0u8; L::HEADER_LEN];
        let got = read_full(&mut reader, &mut head)?;
        if got < L::HEADER_LEN {
            return Err(Error::format(format!(
                "header is {got} bytes, expected {}",
                L::HEADER_LEN
            )));
        }
        let header = L::parse_header(&head)?;

        let extra = header.header_len as u64 - L::HEADER_LEN as u64;
        if extra > 0 && skip_bytes(&mut reader, extra)? < extra {
            return Err(Error::format("file ends inside the declared header"));
        }

        if config.checkpoint > 0 {
            let want = config.checkpoint * L::RECORD_LEN as u64;
            let skipped = skip_bytes(&mut reader, want)?;
            if skipped < want {
                let whole = skipped / L::RECORD_LEN as u64;
                let tail = (skipped % L::RECORD_LEN as u64) as usize;
                if tail > 0 {
                    return Err(Error::TruncatedRecord {
                        records_decoded: 0,
                        trailing_bytes: tail,
                    });
                }
                return Err(Error::data(format!(
                    "checkpoint {} is past the last record ({whole})",
                    config.checkpoint
                )));
            }
        }

        debug!(
            kind = ?L::KIND,
            header_len = header.header_len,
            record_len = header.record_len,
            checkpoint = config.checkpoint,
            "header accepted"
        );

        Ok(Self {
            reader,
            position: config.checkpoint,
            config,
            header,
            buf: vec![0u8; L::RECORD_LEN],
            decoded: 0,
            suspect: 0,
            watermark: None,
            done: false,
            _layout: PhantomData,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Index of the next record in the file; persist it to resume later.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Records decoded by this decoder (excludes checkpoint skips).
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Records emitted with the suspect flag.
    pub fn suspect_count(&self) -> u64 {
        self.suspect
    }

    fn next_record(&mut self) -> Result<Option<L::Record>> {
        let got = read_full(&mut self.reader, &mut self.buf)?;
        if got == 0 {
            debug!(kind = ?L::KIND, decoded = self.decoded, "end of input");
            return Ok(None);
        }
        if got < L::RECORD_LEN {
            warn!(
                kind = ?L::KIND,
                decoded = self.decoded,
                trailing_bytes = got,
                "trailing partial record"
            );
            return Err(Error::TruncatedRecord {
                records_decoded: self.decoded,
                trailing_bytes: got,
            });
        }

        let mut record = L::decode(&self.buf, self.config.price_multiplier)?;
        let ts = L::timestamp(&record);

        match self.watermark {
            Some(previous) if ts < previous => match self.config.ordering {
                OrderingMode::Strict => {
                    return Err(Error::OutOfOrder {
                        index: self.position,
                        previous: previous.micros(),
                        current: ts.micros(),
                    });
                }
                OrderingMode::Lenient => {
                    warn!(index = self.position, %previous, current = %ts, "suspect record");
                    L::mark_suspect(&mut record);
                    self.suspect += 1;
                }
            },
            _ => self.watermark = Some(ts),
        }

        self.position += 1;
        self.decoded += 1;
        Ok(Some(record))
    }
}

impl<R: Read, L: RecordLayout> Iterator for Decoder<R, L> {
    type Item = Result<L::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read, L: RecordLayout> FusedIterator for Decoder<R, L> {}

/// Decoder selected at runtime by record kind.
pub enum RecordStream<R> {
    Trades(TradeDecoder<R>),
    Depth(DepthDecoder<R>),
}

impl<R: Read> RecordStream<R> {
    pub fn kind(&self) -> RecordKind {
        match self {
            RecordStream::Trades(_) => RecordKind::Trade,
            RecordStream::Depth(_) => RecordKind::Depth,
        }
    }

    pub fn position(&self) -> u64 {
        match self {
            RecordStream::Trades(d) => d.position(),
            RecordStream::Depth(d) => d.position(),
        }
    }
}

impl<R: Read> Iterator for RecordStream<R> {
    type Item = Result<MarketRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            RecordStream::Trades(d) => d.next().map(|r| r.map(MarketRecord::Trade)),
            RecordStream::Depth(d) => d.next().map(|r| r.map(MarketRecord::Depth)),
        }
    }
}

/// Open a decoder for `kind` over `reader`.
pub fn open<R: Read>(reader: R, kind: RecordKind, config: DecoderConfig) -> Result<RecordStream<R>> {
    Ok(match kind {
        RecordKind::Trade => RecordStream::Trades(TradeDecoder::new(reader, config)?),
        RecordKind::Depth => RecordStream::Depth(DepthDecoder::new(reader, config)?),
    })
}

/// Writes a header followed by records in the same layout the decoder reads.
pub struct RecordWriter<W: Write, L: RecordLayout> {
    writer: W,
    scratch: Vec<u8>,
    written: u64,
    _layout: PhantomData<L>,
}

impl<W: Write, L: RecordLayout> RecordWriter<W, L> {
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(&L::header_bytes())?;
        Ok(Self {
            writer,
            scratch: Vec::with_capacity(L::RECORD_LEN),
            written: 0,
            _layout: PhantomData,
        })
    }

    pub fn write(&mut self, record: &L::Record) -> Result<()> {
        self.scratch.clear();
        L::encode(record, &mut self.scratch)?;
        self.writer.write_all(&self.scratch)?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Encode trades into an in-memory intraday file.
pub fn encode_trades(records: &[TradeRecord]) -> Result<Vec<u8>> {
    let mut writer = RecordWriter::<_, Intraday>::new(Vec::new())?;
    for record in records {
        writer.write(record)?;
    }
    writer.finish()
}

/// Encode depth updates into an in-memory depth file.
pub fn encode_depth(records: &[DepthRecord]) -> Result<Vec<u8>> {
    let mut writer = RecordWriter::<_, Depth>::new(Vec::new())?;
    for record in records {
        writer.write(record)?;
    }
    writer.finish()
}
