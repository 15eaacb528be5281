//! Chunked transport for size-constrained channels (QR codes, deep links)
//!
//! A frame is `base58check(rlp([version, messageId, partIndex, totalParts, chunk]))`.
//! The message id is the first 8 bytes of blake2b-256 of the whole text, so
//! the same text always splits into the same frames and a reassembled text
//! can be checked against it.
//!
//! Reassembly is all-or-nothing: a message is handed out only once every
//! part has arrived, and never partially.

use crate::config::{TransportConfig, MIN_FRAME_LEN};
use crate::error::WasmIacError;
use crate::rlp::{self, RlpItem};
use blake2::{digest::consts::U32, Blake2b, Digest};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, trace};

pub const FRAME_VERSION: u64 = 1;
pub const MESSAGE_ID_LEN: usize = 8;

/// Most parts a message may be split into
pub const MAX_PARTS: usize = u16::MAX as usize;

/// Upper bound on frame bytes besides the chunk itself: list header (3),
/// version (1), message id (9), part index and total (3 each), chunk header
/// (3) and the base58check checksum (4)
const FRAME_OVERHEAD: usize = 26;

pub type MessageId = [u8; MESSAGE_ID_LEN];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub message_id: MessageId,
    pub part_index: usize,
    pub total_parts: usize,
    pub chunk: Vec<u8>,
}

impl Frame {
    pub fn encode(&self) -> String {
        let item = RlpItem::List(vec![
            RlpItem::uint(FRAME_VERSION),
            RlpItem::bytes(self.message_id.to_vec()),
            RlpItem::uint(self.part_index as u64),
            RlpItem::uint(self.total_parts as u64),
            RlpItem::bytes(self.chunk.clone()),
        ]);
        bs58::encode(rlp::encode(&item)).with_check().into_string()
    }

    fn from_items(items: &[RlpItem]) -> Result<Frame, WasmIacError> {
        let [version, message_id, part_index, total_parts, chunk] = items else {
            return Err(WasmIacError::InvalidFrame(format!(
                "Frame must have 5 elements, got {}",
                items.len()
            )));
        };
        let version = version.as_u64("frame version")?;
        if version != FRAME_VERSION {
            return Err(WasmIacError::VersionMismatch {
                expected: FRAME_VERSION,
                found: version,
            });
        }
        let message_id: MessageId = message_id
            .as_bytes("message id")?
            .try_into()
            .map_err(|_| {
                WasmIacError::InvalidFrame(format!("Message id must be {} bytes", MESSAGE_ID_LEN))
            })?;
        let part_index = as_count(part_index, "part index")?;
        let total_parts = as_count(total_parts, "total parts")?;
        if total_parts == 0 || total_parts > MAX_PARTS || part_index >= total_parts {
            return Err(WasmIacError::InvalidFrame(format!(
                "Part {} of {} is out of range",
                part_index, total_parts
            )));
        }
        let chunk = chunk.as_bytes("chunk")?.to_vec();
        if chunk.is_empty() {
            return Err(WasmIacError::InvalidFrame("Empty chunk".to_string()));
        }
        Ok(Frame {
            message_id,
            part_index,
            total_parts,
            chunk,
        })
    }
}

/// Parse `text` as a frame, or `None` if it is a complete, unchunked message
pub fn parse_frame(text: &str) -> Result<Option<Frame>, WasmIacError> {
    let bytes = bs58::decode(text.trim()).with_check(None).into_vec()?;
    match rlp::decode(&bytes)? {
        RlpItem::List(items) if items.len() == 5 => Frame::from_items(&items).map(Some),
        _ => Ok(None),
    }
}

pub fn message_id(text: &str) -> MessageId {
    let digest = Blake2b::<U32>::digest(text.as_bytes());
    let mut id = [0u8; MESSAGE_ID_LEN];
    id.copy_from_slice(&digest[..MESSAGE_ID_LEN]);
    id
}

/// Split `text` into frames no longer than `max_frame_len` characters
///
/// Text that already fits is returned unchanged as the only element.
pub fn split_into_frames(text: &str, max_frame_len: usize) -> Result<Vec<String>, WasmIacError> {
    if max_frame_len < MIN_FRAME_LEN {
        return Err(WasmIacError::InvalidInput(format!(
            "Frame budget must be at least {}, got {}",
            MIN_FRAME_LEN, max_frame_len
        )));
    }
    if text.is_empty() {
        return Err(WasmIacError::InvalidInput("Nothing to split".to_string()));
    }
    if text.len() <= max_frame_len {
        return Ok(vec![text.to_string()]);
    }

    let chunk_len = chunk_len_for(max_frame_len);
    let total_parts = text.len().div_ceil(chunk_len);
    if total_parts > MAX_PARTS {
        return Err(WasmIacError::InvalidInput(format!(
            "Message needs {} frames, at most {} allowed",
            total_parts, MAX_PARTS
        )));
    }

    let message_id = message_id(text);
    Ok(text
        .as_bytes()
        .chunks(chunk_len)
        .enumerate()
        .map(|(part_index, chunk)| {
            Frame {
                message_id,
                part_index,
                total_parts,
                chunk: chunk.to_vec(),
            }
            .encode()
        })
        .collect())
}

/// Chunk bytes that fit a frame of `max_frame_len` base58 characters
///
/// Base58 needs log58(256) ~ 1.366 characters per byte, so 73 bytes per
/// 100 characters always fits. Budgets are capped so that every length
/// header stays within the size counted in `FRAME_OVERHEAD`.
fn chunk_len_for(max_frame_len: usize) -> usize {
    max_frame_len.min(u16::MAX as usize) * 73 / 100 - FRAME_OVERHEAD
}

/// Reassemble one message from all of its frames, in any order
///
/// A single unchunked text is returned as is.
pub fn reassemble_frames<S: AsRef<str>>(frames: &[S]) -> Result<String, WasmIacError> {
    let mut message: Option<(MessageId, PendingMessage)> = None;

    for text in frames {
        let text = text.as_ref();
        let Some(frame) = parse_frame(text)? else {
            if frames.len() == 1 {
                return Ok(text.trim().to_string());
            }
            return Err(WasmIacError::InvalidFrame(
                "Unchunked message mixed with frames".to_string(),
            ));
        };

        let (id, pending) = message.get_or_insert_with(|| {
            (
                frame.message_id,
                PendingMessage::new(frame.total_parts, 0),
            )
        });
        if *id != frame.message_id {
            return Err(WasmIacError::InvalidFrame(
                "Frames belong to different messages".to_string(),
            ));
        }
        pending.insert(frame, 0)?;
    }

    let (id, pending) =
        message.ok_or_else(|| WasmIacError::InvalidInput("No frames given".to_string()))?;
    let missing = pending.missing();
    if !missing.is_empty() {
        return Err(WasmIacError::ChunkAssemblyIncomplete {
            message_id: hex::encode(id),
            missing,
        });
    }
    pending.assemble(&id)
}

#[derive(Debug)]
struct PendingMessage {
    total_parts: usize,
    parts: BTreeMap<usize, Vec<u8>>,
    last_seen_ms: u64,
}

impl PendingMessage {
    fn new(total_parts: usize, now_ms: u64) -> Self {
        Self {
            total_parts,
            parts: BTreeMap::new(),
            last_seen_ms: now_ms,
        }
    }

    /// Add a part; an identical repeat is ignored, a conflicting one is an error
    fn insert(&mut self, frame: Frame, now_ms: u64) -> Result<(), WasmIacError> {
        if frame.total_parts != self.total_parts {
            return Err(WasmIacError::InvalidFrame(format!(
                "Part count changed from {} to {}",
                self.total_parts, frame.total_parts
            )));
        }
        if let Some(existing) = self.parts.get(&frame.part_index) {
            if *existing != frame.chunk {
                return Err(WasmIacError::InvalidFrame(format!(
                    "Part {} received twice with different content",
                    frame.part_index
                )));
            }
        } else {
            self.parts.insert(frame.part_index, frame.chunk);
        }
        self.last_seen_ms = now_ms;
        Ok(())
    }

    fn is_complete(&self) -> bool {
        self.parts.len() == self.total_parts
    }

    fn missing(&self) -> Vec<usize> {
        (0..self.total_parts)
            .filter(|index| !self.parts.contains_key(index))
            .collect()
    }

    /// Concatenate the parts and check the result against the message id
    fn assemble(self, id: &MessageId) -> Result<String, WasmIacError> {
        let bytes: Vec<u8> = self.parts.into_values().flatten().collect();
        let text = String::from_utf8(bytes)
            .map_err(|_| WasmIacError::InvalidFrame("Reassembled message is not text".to_string()))?;
        if message_id(&text) != *id {
            return Err(WasmIacError::InvalidFrame(format!(
                "Reassembled message does not match id {}",
                hex::encode(id)
            )));
        }
        Ok(text)
    }
}

/// Incremental reassembly of frames arriving one by one
///
/// Tracks several messages at once. A partial message is dropped when no
/// frame arrived for `stale_after_ms`, or when `max_pending_messages` newer
/// messages push it out. Time comes from the caller as milliseconds.
#[derive(Debug)]
pub struct FrameAssembler {
    config: TransportConfig,
    pending: HashMap<MessageId, PendingMessage>,
    /// Arrival order of pending messages, oldest first
    order: VecDeque<MessageId>,
}

impl Default for FrameAssembler {
    fn default() -> Self {
        Self {
            config: TransportConfig::default(),
            pending: HashMap::new(),
            order: VecDeque::new(),
        }
    }
}

impl FrameAssembler {
    pub fn new(config: TransportConfig) -> Result<Self, WasmIacError> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::default()
        })
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Feed one frame; returns the full text once its message is complete
    ///
    /// Unchunked text is returned immediately. A frame that conflicts with
    /// what was already received drops its whole message.
    pub fn accept(&mut self, text: &str, now_ms: u64) -> Result<Option<String>, WasmIacError> {
        self.evict_stale(now_ms);

        let Some(frame) = parse_frame(text)? else {
            return Ok(Some(text.trim().to_string()));
        };
        let id = frame.message_id;
        let part_index = frame.part_index;

        if !self.pending.contains_key(&id) {
            if self.pending.len() >= self.config.max_pending_messages {
                self.evict_oldest();
            }
            self.pending
                .insert(id, PendingMessage::new(frame.total_parts, now_ms));
            self.order.push_back(id);
        }

        let Some(message) = self.pending.get_mut(&id) else {
            return Ok(None);
        };
        if let Err(err) = message.insert(frame, now_ms) {
            debug!(message_id = %hex::encode(id), error = %err, "dropping message");
            self.remove(&id);
            return Err(err);
        }
        trace!(
            message_id = %hex::encode(id),
            part_index,
            received = message.parts.len(),
            total_parts = message.total_parts,
            "accepted frame"
        );

        if !message.is_complete() {
            return Ok(None);
        }
        match self.remove(&id) {
            Some(message) => {
                debug!(message_id = %hex::encode(id), "message complete");
                message.assemble(&id).map(Some)
            }
            None => Ok(None),
        }
    }

    /// Drop partial messages idle for longer than `stale_after_ms`
    ///
    /// Returns how many were dropped.
    pub fn evict_stale(&mut self, now_ms: u64) -> usize {
        let stale_after_ms = self.config.stale_after_ms;
        let stale: Vec<MessageId> = self
            .pending
            .iter()
            .filter(|(_, message)| now_ms.saturating_sub(message.last_seen_ms) > stale_after_ms)
            .map(|(id, _)| *id)
            .collect();
        for id in &stale {
            debug!(message_id = %hex::encode(id), "evicting stale message");
            self.remove(id);
        }
        stale.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Part indices still missing for a pending message
    pub fn missing(&self, message_id: &MessageId) -> Option<Vec<usize>> {
        self.pending.get(message_id).map(PendingMessage::missing)
    }

    fn evict_oldest(&mut self) {
        if let Some(id) = self.order.front().copied() {
            debug!(message_id = %hex::encode(id), "pending limit reached, evicting oldest");
            self.remove(&id);
        }
    }

    fn remove(&mut self, id: &MessageId) -> Option<PendingMessage> {
        self.order.retain(|queued| queued != id);
        self.pending.remove(id)
    }
}

/// [`FrameAssembler`] shared between threads
#[derive(Debug, Clone, Default)]
pub struct SharedFrameAssembler {
    inner: Arc<Mutex<FrameAssembler>>,
}

impl SharedFrameAssembler {
    pub fn new(config: TransportConfig) -> Result<Self, WasmIacError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(FrameAssembler::new(config)?)),
        })
    }

    pub fn accept(&self, text: &str, now_ms: u64) -> Result<Option<String>, WasmIacError> {
        self.inner.lock().accept(text, now_ms)
    }

    pub fn evict_stale(&self, now_ms: u64) -> usize {
        self.inner.lock().evict_stale(now_ms)
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending_count()
    }
}

fn as_count(item: &RlpItem, field: &str) -> Result<usize, WasmIacError> {
    usize::try_from(item.as_u64(field)?)
        .map_err(|_| WasmIacError::InvalidFrame(format!("{} out of range", field)))
}
