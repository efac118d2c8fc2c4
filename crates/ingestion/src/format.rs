//! On-disk layouts of the platform's intraday (`.scid`) and market depth
//! (`.depth`) files.
//!
//! All integers and floats are little-endian. Field offsets follow the
//! platform documentation byte for byte.

use contango_core::{
    AggressorSide, BookSide, DepthCommand, DepthRecord, Error, RecordKind, Result, ScDateTime,
    TradeRecord,
};

/// Intraday file tag.
pub const SCID_TAG: [u8; 4] = *b"SCID";
/// Intraday header size in bytes.
pub const SCID_HEADER_LEN: usize = 56;
/// Intraday record size in bytes.
pub const SCID_RECORD_LEN: usize = 40;

/// Depth file tag.
pub const DEPTH_TAG: [u8; 4] = *b"SCDD";
/// Depth header size in bytes.
pub const DEPTH_HEADER_LEN: usize = 64;
/// Depth record size in bytes.
pub const DEPTH_RECORD_LEN: usize = 24;

/// The only layout version either file kind has shipped.
pub const FORMAT_VERSION: u32 = 1;

const CMD_CLEAR_BOOK: u8 = 1;
const CMD_ADD_BID_LEVEL: u8 = 2;
const CMD_ADD_ASK_LEVEL: u8 = 3;
const CMD_MODIFY_BID_LEVEL: u8 = 4;
const CMD_MODIFY_ASK_LEVEL: u8 = 5;
const CMD_DELETE_BID_LEVEL: u8 = 6;
const CMD_DELETE_ASK_LEVEL: u8 = 7;

/// Parsed file header, common to both kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub tag: [u8; 4],
    /// Header size declared by the file.
    pub header_len: u32,
    /// Record size declared by the file.
    pub record_len: u32,
    pub version: u32,
    /// Intraday files only; zero for depth files.
    pub utc_start_index: u32,
}

/// A fixed-size record layout.
pub trait RecordLayout {
    type Record;

    const KIND: RecordKind;
    const TAG: [u8; 4];
    const HEADER_LEN: usize;
    const RECORD_LEN: usize;

    /// Parse and validate the fixed part of the header.
    fn parse_header(buf: &[u8]) -> Result<FileHeader>;

    /// Header bytes for a fresh file.
    fn header_bytes() -> Vec<u8>;

    /// Decode one record of exactly `RECORD_LEN` bytes.
    fn decode(buf: &[u8], price_multiplier: f64) -> Result<Self::Record>;

    /// Append one record in raw units.
    fn encode(record: &Self::Record, out: &mut Vec<u8>) -> Result<()>;

    fn timestamp(record: &Self::Record) -> ScDateTime;

    fn mark_suspect(record: &mut Self::Record);
}

#[inline]
fn u16_at(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

#[inline]
fn u32_at(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

#[inline]
fn f32_at(buf: &[u8], off: usize) -> f32 {
    f32::from_bits(u32_at(buf, off))
}

/// Record timestamp at offset 0, rejected when no recording could hold it.
fn timestamp_at(buf: &[u8], format: &str) -> Result<ScDateTime> {
    let ts = ScDateTime(i64_at(buf, 0));
    if !ts.is_valid() {
        return Err(Error::format(format!(
            "{format}: timestamp {} outside the recordable range",
            ts.micros()
        )));
    }
    Ok(ts)
}

#[inline]
fn i64_at(buf: &[u8], off: usize) -> i64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&buf[off..off + 8]);
    i64::from_le_bytes(bytes)
}

fn check_common(
    kind: &str,
    header: &FileHeader,
    expected_tag: [u8; 4],
    min_header_len: usize,
    record_len: usize,
) -> Result<()> {
    if header.tag != expected_tag {
        return Err(Error::format(format!(
            "{kind}: unrecognized tag {:?}",
            String::from_utf8_lossy(&header.tag)
        )));
    }
    if header.version != FORMAT_VERSION {
        return Err(Error::format(format!(
            "{kind}: unsupported version {}",
            header.version
        )));
    }
    if (header.header_len as usize) < min_header_len {
        return Err(Error::format(format!(
            "{kind}: header size {} below {min_header_len}",
            header.header_len
        )));
    }
    if header.record_len as usize != record_len {
        return Err(Error::format(format!(
            "{kind}: record size {} (expected {record_len})",
            header.record_len
        )));
    }
    Ok(())
}

/// Intraday tick file: one trade per 40-byte record.
///
/// | off | field                                  |
/// |-----|----------------------------------------|
/// | 0   | i64 datetime                           |
/// | 8   | f32 open (bundling marker, ignored)    |
/// | 12  | f32 high = ask at trade time           |
/// | 16  | f32 low = bid at trade time            |
/// | 20  | f32 close = trade price                |
/// | 24  | u32 number of trades                   |
/// | 28  | u32 total volume                       |
/// | 32  | u32 bid volume                         |
/// | 36  | u32 ask volume                         |
pub struct Intraday;

impl RecordLayout for Intraday {
    type Record = TradeRecord;

    const KIND: RecordKind = RecordKind::Trade;
    const TAG: [u8; 4] = SCID_TAG;
    const HEADER_LEN: usize = SCID_HEADER_LEN;
    const RECORD_LEN: usize = SCID_RECORD_LEN;

    fn parse_header(buf: &[u8]) -> Result<FileHeader> {
        let header = FileHeader {
            tag: [buf[0], buf[1], buf[2], buf[3]],
            header_len: u32_at(buf, 4),
            record_len: u32_at(buf, 8),
            version: u16_at(buf, 12) as u32,
            utc_start_index: u32_at(buf, 16),
        };
        check_common("scid", &header, SCID_TAG, SCID_HEADER_LEN, SCID_RECORD_LEN)?;
        Ok(header)
    }

    fn header_bytes() -> Vec<u8> {
        let mut out = vec![0u8; SCID_HEADER_LEN];
        out[0..4].copy_from_slice(&SCID_TAG);
        out[4..8].copy_from_slice(&(SCID_HEADER_LEN as u32).to_le_bytes());
        out[8..12].copy_from_slice(&(SCID_RECORD_LEN as u32).to_le_bytes());
        out[12..14].copy_from_slice(&(FORMAT_VERSION as u16).to_le_bytes());
        out
    }

    fn decode(buf: &[u8], price_multiplier: f64) -> Result<TradeRecord> {
        let ts = timestamp_at(buf, "scid")?;
        let ask = f32_at(buf, 12) as f64;
        let bid = f32_at(buf, 16) as f64;
        let price = f32_at(buf, 20) as f64;
        let num_trades = u32_at(buf, 24);
        let total_volume = u32_at(buf, 28);
        let bid_volume = u32_at(buf, 32);
        let ask_volume = u32_at(buf, 36);

        if !price.is_finite() {
            return Err(Error::format(format!("scid: non-finite price at {ts}")));
        }

        let side = if bid_volume > 0 {
            AggressorSide::Sell
        } else if ask_volume > 0 {
            AggressorSide::Buy
        } else {
            AggressorSide::Unknown
        };

        let volume = if total_volume > 0 {
            total_volume
        } else {
            bid_volume.saturating_add(ask_volume)
        };
        if volume == 0 {
            return Err(Error::format(format!("scid: zero-volume trade at {ts}")));
        }

        Ok(TradeRecord {
            ts,
            price: price * price_multiplier,
            volume,
            side,
            bid_price: bid * price_multiplier,
            ask_price: ask * price_multiplier,
            num_trades,
            suspect: false,
        })
    }

    fn encode(record: &TradeRecord, out: &mut Vec<u8>) -> Result<()> {
        let (bid_volume, ask_volume) = match record.side {
            AggressorSide::Sell => (record.volume, 0),
            AggressorSide::Buy => (0, record.volume),
            AggressorSide::Unknown => (0, 0),
        };
        out.extend_from_slice(&record.ts.micros().to_le_bytes());
        out.extend_from_slice(&0f32.to_le_bytes());
        out.extend_from_slice(&(record.ask_price as f32).to_le_bytes());
        out.extend_from_slice(&(record.bid_price as f32).to_le_bytes());
        out.extend_from_slice(&(record.price as f32).to_le_bytes());
        out.extend_from_slice(&record.num_trades.to_le_bytes());
        out.extend_from_slice(&record.volume.to_le_bytes());
        out.extend_from_slice(&bid_volume.to_le_bytes());
        out.extend_from_slice(&ask_volume.to_le_bytes());
        Ok(())
    }

    fn timestamp(record: &TradeRecord) -> ScDateTime {
        record.ts
    }

    fn mark_suspect(record: &mut TradeRecord) {
        record.suspect = true;
    }
}

/// Market depth file: one book update per 24-byte record.
///
/// | off | field                 |
/// |-----|-----------------------|
/// | 0   | i64 datetime          |
/// | 8   | u8 command            |
/// | 9   | u8 flags              |
/// | 10  | u16 number of orders  |
/// | 12  | f32 price             |
/// | 16  | u32 quantity          |
/// | 20  | u32 reserved          |
pub struct Depth;

impl RecordLayout for Depth {
    type Record = DepthRecord;

    const KIND: RecordKind = RecordKind::Depth;
    const TAG: [u8; 4] = DEPTH_TAG;
    const HEADER_LEN: usize = DEPTH_HEADER_LEN;
    const RECORD_LEN: usize = DEPTH_RECORD_LEN;

    fn parse_header(buf: &[u8]) -> Result<FileHeader> {
        let header = FileHeader {
            tag: [buf[0], buf[1], buf[2], buf[3]],
            header_len: u32_at(buf, 4),
            record_len: u32_at(buf, 8),
            version: u32_at(buf, 12),
            utc_start_index: 0,
        };
        check_common("depth", &header, DEPTH_TAG, DEPTH_HEADER_LEN, DEPTH_RECORD_LEN)?;
        Ok(header)
    }

    fn header_bytes() -> Vec<u8> {
        let mut out = vec![0u8; DEPTH_HEADER_LEN];
        out[0..4].copy_from_slice(&DEPTH_TAG);
        out[4..8].copy_from_slice(&(DEPTH_HEADER_LEN as u32).to_le_bytes());
        out[8..12].copy_from_slice(&(DEPTH_RECORD_LEN as u32).to_le_bytes());
        out[12..16].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        out
    }

    fn decode(buf: &[u8], price_multiplier: f64) -> Result<DepthRecord> {
        let ts = timestamp_at(buf, "depth")?;
        let (command, side) = match buf[8] {
            CMD_CLEAR_BOOK => (DepthCommand::Reset, None),
            CMD_ADD_BID_LEVEL => (DepthCommand::Insert, Some(BookSide::Bid)),
            CMD_ADD_ASK_LEVEL => (DepthCommand::Insert, Some(BookSide::Ask)),
            CMD_MODIFY_BID_LEVEL => (DepthCommand::Update, Some(BookSide::Bid)),
            CMD_MODIFY_ASK_LEVEL => (DepthCommand::Update, Some(BookSide::Ask)),
            CMD_DELETE_BID_LEVEL => (DepthCommand::Delete, Some(BookSide::Bid)),
            CMD_DELETE_ASK_LEVEL => (DepthCommand::Delete, Some(BookSide::Ask)),
            other => {
                return Err(Error::format(format!(
                    "depth: unknown command {other} at {ts}"
                )))
            }
        };
        let price = f32_at(buf, 12) as f64;
        if !price.is_finite() {
            return Err(Error::format(format!("depth: non-finite price at {ts}")));
        }

        Ok(DepthRecord {
            ts,
            command,
            side,
            flags: buf[9],
            num_orders: u16_at(buf, 10),
            price: price * price_multiplier,
            quantity: u32_at(buf, 16),
            suspect: false,
        })
    }

    fn encode(record: &DepthRecord, out: &mut Vec<u8>) -> Result<()> {
        let command = match (record.command, record.side) {
            (DepthCommand::Reset, _) => CMD_CLEAR_BOOK,
            (DepthCommand::Insert, Some(BookSide::Bid)) => CMD_ADD_BID_LEVEL,
            (DepthCommand::Insert, Some(BookSide::Ask)) => CMD_ADD_ASK_LEVEL,
            (DepthCommand::Update, Some(BookSide::Bid)) => CMD_MODIFY_BID_LEVEL,
            (DepthCommand::Update, Some(BookSide::Ask)) => CMD_MODIFY_ASK_LEVEL,
            (DepthCommand::Delete, Some(BookSide::Bid)) => CMD_DELETE_BID_LEVEL,
            (DepthCommand::Delete, Some(BookSide::Ask)) => CMD_DELETE_ASK_LEVEL,
            (command, None) => {
                return Err(Error::data(format!("depth: {command:?} without a book side")))
            }
        };
        out.extend_from_slice(&record.ts.micros().to_le_bytes());
        out.push(command);
        out.push(record.flags);
        out.extend_from_slice(&record.num_orders.to_le_bytes());
        out.extend_from_slice(&(record.price as f32).to_le_bytes());
        out.extend_from_slice(&record.quantity.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        Ok(())
    }

    fn timestamp(record: &DepthRecord) -> ScDateTime {
        record.ts
    }

    fn mark_suspect(record: &mut DepthRecord) {
        record.suspect = true;
    }
}
