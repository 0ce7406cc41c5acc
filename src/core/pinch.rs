//! Pinch graph
//!
//! A thread set over sequences: every thread is a fixed-length interval
//! partitioned into segments, and a block is an equivalence class of
//! equal-length segments, each with an orientation relative to the block.
//! `pinch` aligns two intervals, refining segment boundaries as needed and
//! merging the implicated blocks; `join_trivial_boundaries` fuses adjacent
//! segments whose fusion does not change the alignment content.
//!
//! Storage is arena-based (vectors and indices, no pointer chases): one
//! segment arena, one block arena, and a per-thread ordered map from start
//! coordinate to segment.

use std::collections::{BTreeMap, HashMap, HashSet};

/// Identifier of a thread within a [`PinchThreadSet`]
pub type ThreadId = u32;

type SegId = usize;
type BlockId = usize;

#[derive(Debug, Clone)]
struct Segment {
    thread: ThreadId,
    start: u64,
    length: u64,
    /// Owning block and orientation relative to it (`true` = forward)
    block: Option<(BlockId, bool)>,
}

#[derive(Debug, Clone, Default)]
struct Block {
    /// Member segments in insertion order; the first is the reference
    segments: Vec<SegId>,
    length: u64,
}

/// A segment as seen by callers: where it lies and how it sits in its block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentView {
    pub thread: ThreadId,
    pub start: u64,
    pub length: u64,
    /// Orientation relative to the block reference
    pub forward: bool,
}

/// Set of threads with their segments and blocks
pub struct PinchThreadSet {
    names: Vec<String>,
    by_name: HashMap<String, ThreadId>,
    thread_lengths: Vec<u64>,
    /// Per thread: start coordinate -> segment
    threads: Vec<BTreeMap<u64, SegId>>,
    segments: Vec<Segment>,
    free_segments: Vec<SegId>,
    blocks: Vec<Option<Block>>,
}

impl Default for PinchThreadSet {
    fn default() -> Self {
        Self::new()
    }
}

impl PinchThreadSet {
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            by_name: HashMap::new(),
            thread_lengths: Vec::new(),
            threads: Vec::new(),
            segments: Vec::new(),
            free_segments: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Create a thread covering `[0, length)` with a single segment;
    /// returns the existing thread when the name is already known
    pub fn add_thread(&mut self, name: &str, length: u64) -> ThreadId {
        if let Some(&id) = self.by_name.get(name) {
            return id;
        }
        let id = self.names.len() as ThreadId;
        self.names.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        self.thread_lengths.push(length);
        let mut map = BTreeMap::new();
        if length > 0 {
            let seg = self.alloc_segment(Segment {
                thread: id,
                start: 0,
                length,
                block: None,
            });
            map.insert(0, seg);
        }
        self.threads.push(map);
        id
    }

    pub fn get_thread(&self, name: &str) -> Option<ThreadId> {
        self.by_name.get(name).copied()
    }

    pub fn thread_name(&self, id: ThreadId) -> &str {
        &self.names[id as usize]
    }

    pub fn thread_length(&self, id: ThreadId) -> u64 {
        self.thread_lengths[id as usize]
    }

    pub fn thread_count(&self) -> usize {
        self.names.len()
    }

    /// Total number of live segments across all threads
    pub fn segment_count(&self) -> usize {
        self.threads.iter().map(|m| m.len()).sum()
    }

    fn alloc_segment(&mut self, segment: Segment) -> SegId {
        match self.free_segments.pop() {
            Some(id) => {
                self.segments[id] = segment;
                id
            }
            None => {
                self.segments.push(segment);
                self.segments.len() - 1
            }
        }
    }

    fn free_segment(&mut self, id: SegId) {
        self.segments[id].block = None;
        self.free_segments.push(id);
    }

    /// Segment containing `pos` on `thread`
    fn seg_at(&self, thread: ThreadId, pos: u64) -> SegId {
        let (_, &id) = self.threads[thread as usize]
            .range(..=pos)
            .next_back()
            .expect("position outside thread");
        debug_assert!(pos < self.segments[id].start + self.segments[id].length);
        id
    }

    /// Ensure a segment boundary at `pos` (no-op at 0, at the thread end,
    /// or where a boundary already exists)
    fn split_at(&mut self, thread: ThreadId, pos: u64) {
        if pos == 0 || pos >= self.thread_lengths[thread as usize] {
            return;
        }
        let seg = self.seg_at(thread, pos);
        let offset = pos - self.segments[seg].start;
        if offset > 0 {
            self.split_segment(seg, offset);
        }
    }

    /// Split `seg` at `offset`; a segment in a block splits the whole block
    /// at the matching per-orientation offsets
    fn split_segment(&mut self, seg: SegId, offset: u64) {
        debug_assert!(offset > 0 && offset < self.segments[seg].length);
        match self.segments[seg].block {
            None => {
                self.raw_split(seg, offset);
            }
            Some((block_id, seg_forward)) => {
                let members = self.blocks[block_id]
                    .as_ref()
                    .expect("live block")
                    .segments
                    .clone();
                let old_len = self.blocks[block_id].as_ref().unwrap().length;
                // the thread-relative offset of a reversed member addresses
                // the block from its far end
                let block_offset = if seg_forward { offset } else { old_len - offset };
                let right_id = self.blocks.len();
                self.blocks.push(Some(Block {
                    segments: Vec::with_capacity(members.len()),
                    length: old_len - block_offset,
                }));
                let mut left_members = Vec::with_capacity(members.len());
                for m in members {
                    let (_, forward) = self.segments[m].block.expect("member has block");
                    if forward {
                        let right = self.raw_split(m, block_offset);
                        self.segments[right].block = Some((right_id, true));
                        left_members.push(m);
                        self.blocks[right_id].as_mut().unwrap().segments.push(right);
                    } else {
                        // reversed member: the thread-left piece carries the
                        // block's right half and vice versa
                        let right = self.raw_split(m, old_len - block_offset);
                        self.segments[m].block = Some((right_id, false));
                        self.segments[right].block = Some((block_id, false));
                        left_members.push(right);
                        self.blocks[right_id].as_mut().unwrap().segments.push(m);
                    }
                }
                let left = self.blocks[block_id].as_mut().unwrap();
                left.segments = left_members;
                left.length = block_offset;
            }
        }
    }

    /// Split a single segment without touching blocks; returns the new
    /// right-hand segment
    fn raw_split(&mut self, seg: SegId, offset: u64) -> SegId {
        let (thread, start, length, block) = {
            let s = &self.segments[seg];
            (s.thread, s.start, s.length, s.block)
        };
        debug_assert!(offset > 0 && offset < length);
        self.segments[seg].length = offset;
        let new_id = self.alloc_segment(Segment {
            thread,
            start: start + offset,
            length: length - offset,
            block,
        });
        // caller fixes block membership; a blockless split stays blockless
        self.segments[new_id].block = None;
        self.threads[thread as usize].insert(start + offset, new_id);
        new_id
    }

    /// Align `[start_a, start_a + length)` of `a` with
    /// `[start_b, start_b + length)` of `b`
    ///
    /// With `same_strand = false` the `b` interval is read right to left.
    /// Segments already in blocks drag their blocks along: boundaries are
    /// refined, then the two covering blocks merge, inverting stored
    /// orientations for the side that requires it.
    pub fn pinch(
        &mut self,
        a: ThreadId,
        b: ThreadId,
        start_a: u64,
        start_b: u64,
        length: u64,
        same_strand: bool,
    ) {
        if length == 0 {
            return;
        }
        debug_assert!(start_a + length <= self.thread_lengths[a as usize]);
        debug_assert!(start_b + length <= self.thread_lengths[b as usize]);
        let end_b = start_b + length;
        let mut off = 0;
        while off < length {
            let rem = length - off;
            // refine until both sides expose an equal-length chunk; block
            // splits can cascade, shrinking a side mid-iteration
            loop {
                self.split_at(a, start_a + off);
                if same_strand {
                    self.split_at(b, start_b + off);
                } else {
                    self.split_at(b, end_b - off);
                }
                let sa = self.seg_at(a, start_a + off);
                let avail_a = self.segments[sa].length.min(rem);
                let avail_b = if same_strand {
                    let sb = self.seg_at(b, start_b + off);
                    self.segments[sb].length.min(rem)
                } else {
                    let sb = self.seg_at(b, end_b - off - 1);
                    (end_b - off - self.segments[sb].start).min(rem)
                };
                let chunk = avail_a.min(avail_b);
                self.split_at(a, start_a + off + chunk);
                if same_strand {
                    self.split_at(b, start_b + off + chunk);
                } else {
                    self.split_at(b, end_b - off - chunk);
                }
                let sa = self.seg_at(a, start_a + off);
                let sb = if same_strand {
                    self.seg_at(b, start_b + off)
                } else {
                    self.seg_at(b, end_b - off - chunk)
                };
                if self.segments[sa].length == chunk && self.segments[sb].length == chunk {
                    if sa != sb {
                        self.merge_segments(sa, sb, same_strand);
                    }
                    off += chunk;
                    break;
                }
            }
        }
    }

    /// Place two equal-length segments in one block, `same` giving their
    /// mutual orientation
    fn merge_segments(&mut self, sa: SegId, sb: SegId, same: bool) {
        debug_assert_eq!(self.segments[sa].length, self.segments[sb].length);
        match (self.segments[sa].block, self.segments[sb].block) {
            (None, None) => {
                let id = self.blocks.len();
                self.blocks.push(Some(Block {
                    segments: vec![sa, sb],
                    length: self.segments[sa].length,
                }));
                self.segments[sa].block = Some((id, true));
                self.segments[sb].block = Some((id, same));
            }
            (Some((ba, oa)), None) => {
                self.segments[sb].block = Some((ba, oa == same));
                self.blocks[ba].as_mut().unwrap().segments.push(sb);
            }
            (None, Some((bb, ob))) => {
                self.segments[sa].block = Some((bb, ob == same));
                self.blocks[bb].as_mut().unwrap().segments.push(sa);
            }
            (Some((ba, oa)), Some((bb, ob))) => {
                if ba == bb {
                    return;
                }
                let size_a = self.blocks[ba].as_ref().unwrap().segments.len();
                let size_b = self.blocks[bb].as_ref().unwrap().segments.len();
                if size_a >= size_b {
                    // sb's block folds into sa's; flip when sb's stored
                    // orientation disagrees with the requested relation
                    let flip = (oa == same) != ob;
                    self.absorb_block(ba, bb, flip);
                } else {
                    let flip = (ob == same) != oa;
                    self.absorb_block(bb, ba, flip);
                }
            }
        }
    }

    /// Move every member of `src` into `dst`, optionally flipping
    /// orientations, and kill `src`
    fn absorb_block(&mut self, dst: BlockId, src: BlockId, flip: bool) {
        let members = self.blocks[src].take().expect("live block").segments;
        for m in &members {
            let (_, om) = self.segments[*m].block.expect("member has block");
            self.segments[*m].block = Some((dst, if flip { !om } else { om }));
        }
        self.blocks[dst].as_mut().unwrap().segments.extend(members);
    }

    /// Fuse every trivial boundary: adjacent blockless segments, and
    /// adjacent segments whose blocks run in parallel across all members.
    /// Idempotent.
    pub fn join_trivial_boundaries(&mut self) {
        for t in 0..self.threads.len() {
            let mut pos = 0u64;
            loop {
                let Some((&s_start, &s_id)) = self.threads[t].range(pos..).next() else {
                    break;
                };
                let s_end = s_start + self.segments[s_id].length;
                let Some((&t_start, &t_id)) = self.threads[t].range(s_end..).next() else {
                    break;
                };
                debug_assert_eq!(t_start, s_end);
                let fused = match (self.segments[s_id].block, self.segments[t_id].block) {
                    (None, None) => {
                        self.fuse_plain(s_id, t_id);
                        true
                    }
                    (Some((ba, _)), Some((bb, _))) if ba != bb => {
                        self.try_join_blocks(ba, bb) || self.try_join_blocks(bb, ba)
                    }
                    _ => false,
                };
                if !fused {
                    pos = t_start;
                }
                // on fusion, stay: the surviving segment may fuse again
            }
        }
    }

    /// Fuse two adjacent blockless segments into the left one
    fn fuse_plain(&mut self, left: SegId, right: SegId) {
        let right_start = self.segments[right].start;
        let right_len = self.segments[right].length;
        self.threads[self.segments[right].thread as usize].remove(&right_start);
        self.segments[left].length += right_len;
        self.free_segment(right);
    }

    /// Join block `second` onto the tail of block `first` when every member
    /// of `first` continues (in its own orientation) into a distinct member
    /// of `second` with the same orientation
    fn try_join_blocks(&mut self, first: BlockId, second: BlockId) -> bool {
        let members = self.blocks[first].as_ref().expect("live block").segments.clone();
        let second_size = self.blocks[second].as_ref().expect("live block").segments.len();
        if members.len() != second_size {
            return false;
        }
        let mut partners: Vec<(SegId, SegId, bool)> = Vec::with_capacity(members.len());
        let mut seen: HashSet<SegId> = HashSet::with_capacity(members.len());
        for &m in &members {
            let (_, om) = self.segments[m].block.expect("member has block");
            let thread = self.segments[m].thread as usize;
            let neighbor = if om {
                let end = self.segments[m].start + self.segments[m].length;
                match self.threads[thread].range(end..).next() {
                    Some((&start, &id)) if start == end => id,
                    _ => return false,
                }
            } else {
                let start = self.segments[m].start;
                match self.threads[thread].range(..start).next_back() {
                    Some((_, &id))
                        if self.segments[id].start + self.segments[id].length == start =>
                    {
                        id
                    }
                    _ => return false,
                }
            };
            match self.segments[neighbor].block {
                Some((b, on)) if b == second && on == om => {}
                _ => return false,
            }
            if !seen.insert(neighbor) {
                return false;
            }
            partners.push((m, neighbor, om));
        }

        // every continuation checks out: fuse pairwise
        let second_len = self.blocks[second].as_ref().unwrap().length;
        let mut new_members = Vec::with_capacity(partners.len());
        for (m, n, om) in partners {
            let (survivor, absorbed) = if om { (m, n) } else { (n, m) };
            let absorbed_start = self.segments[absorbed].start;
            let absorbed_len = self.segments[absorbed].length;
            let thread = self.segments[absorbed].thread as usize;
            self.threads[thread].remove(&absorbed_start);
            self.segments[survivor].length += absorbed_len;
            if !om {
                // survivor is the left-hand piece from `second`
                debug_assert_eq!(self.segments[survivor].start, absorbed_start - second_len);
            }
            self.segments[survivor].block = Some((first, om));
            self.free_segment(absorbed);
            new_members.push(survivor);
        }
        let block = self.blocks[first].as_mut().unwrap();
        block.segments = new_members;
        block.length += second_len;
        self.blocks[second] = None;
        true
    }

    /// Block identifiers in first-encounter order: threads by id, segments
    /// by position
    pub fn block_ids(&self) -> Vec<usize> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        for map in &self.threads {
            for &seg in map.values() {
                if let Some((block, _)) = self.segments[seg].block {
                    if seen.insert(block) {
                        order.push(block);
                    }
                }
            }
        }
        order
    }

    /// Member segments of a block, in insertion order
    pub fn block_segments(&self, block: usize) -> Vec<SegmentView> {
        self.blocks[block]
            .as_ref()
            .expect("live block")
            .segments
            .iter()
            .map(|&id| {
                let s = &self.segments[id];
                let (_, forward) = s.block.expect("member has block");
                SegmentView {
                    thread: s.thread,
                    start: s.start,
                    length: s.length,
                    forward,
                }
            })
            .collect()
    }

    /// Number of segments in a block
    pub fn block_degree(&self, block: usize) -> usize {
        self.blocks[block].as_ref().expect("live block").segments.len()
    }

    /// Verify the structural invariants; used by tests
    pub fn check_integrity(&self) -> std::result::Result<(), String> {
        for (t, map) in self.threads.iter().enumerate() {
            let mut expected = 0u64;
            for (&start, &seg) in map {
                if start != expected {
                    return Err(format!(
                        "thread {} has a hole or overlap at {} (expected {})",
                        t, start, expected
                    ));
                }
                if self.segments[seg].start != start || self.segments[seg].thread as usize != t {
                    return Err(format!("segment index out of sync on thread {}", t));
                }
                expected = start + self.segments[seg].length;
            }
            if expected != self.thread_lengths[t] {
                return Err(format!(
                    "thread {} covers {} of {}",
                    t, expected, self.thread_lengths[t]
                ));
            }
        }
        for (id, block) in self.blocks.iter().enumerate() {
            let Some(block) = block else { continue };
            if block.segments.is_empty() {
                return Err(format!("block {} is empty", id));
            }
            for &seg in &block.segments {
                if self.segments[seg].length != block.length {
                    return Err(format!(
                        "block {} length {} but member has {}",
                        id, block.length, self.segments[seg].length
                    ));
                }
                match self.segments[seg].block {
                    Some((b, _)) if b == id => {}
                    _ => return Err(format!("block {} member back-pointer broken", id)),
                }
            }
        }
        Ok(())
    }
}
