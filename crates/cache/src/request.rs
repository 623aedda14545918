//! Requests and their decomposition into cacheline-aligned sub-requests.

/// A word-sized load or store against the 32-bit address space.
///
/// Stores are always 4 bytes starting at `addr`; `data`'s low bytes carry the
/// bytes to write in little-endian order. Loads ignore `data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Byte address of the first byte touched.
    pub addr: u32,
    /// 32-bit word to store (ignored for loads).
    pub data: u32,
    /// `true` for a store, `false` for a load.
    pub we: bool,
}

/// A piece of a [`Request`] that fits within a single cacheline.
///
/// A `Request` decomposes into one or two `SubRequest`s depending on whether
/// it straddles a cacheline boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRequest {
    /// Byte address of this piece.
    pub addr: u32,
    /// Number of bytes this piece covers, 1..=4.
    pub size: u8,
    /// Low `size` bytes valid for stores; for loads this is unused on input.
    pub data: u32,
    /// Bit offset (a multiple of 8, 0..=24) of this piece within the
    /// original request's 32-bit word.
    pub bits_before: u8,
    /// `true` for a store, `false` for a load.
    pub we: bool,
}

/// Splits a request into cacheline-aligned sub-requests.
///
/// `aligned` walks cacheline boundaries starting at the line containing
/// `request.addr`; each iteration emits the overlap between
/// `[request.addr, request.addr + 4)` and `[aligned, aligned + cacheline_size)`.
/// Produces one piece when the request lies entirely in one line, two when it
/// straddles a boundary — never more, since a cacheline is always at least 16
/// bytes and a request is at most 4 bytes.
///
/// The alignment computation is done in `u64` and truncated back to `u32`,
/// which is equivalent to wrapping if `addr` is within `u32::MAX - cacheline_size`
/// of the top of the address space; this implementation does not saturate.
pub fn split(request: Request, cacheline_size: u32) -> Vec<SubRequest> {
    let cacheline_size = u64::from(cacheline_size);
    let addr = u64::from(request.addr);
    let end = addr + 4;

    let mut pieces = Vec::with_capacity(2);
    let mut aligned = (addr / cacheline_size) * cacheline_size;
    while aligned < end {
        let start = addr.max(aligned);
        let stop = end.min(aligned + cacheline_size);
        let size = (stop - start) as u8;
        let bytes_consumed = (start - addr) as u8;
        let bits_before = bytes_consumed * 8;

        let data = if request.we {
            (request.data >> bits_before) & byte_mask(size)
        } else {
            0
        };

        pieces.push(SubRequest {
            addr: start as u32,
            size,
            data,
            bits_before,
            we: request.we,
        });

        aligned += cacheline_size;
    }
    pieces
}

/// Merges a partially-read value into the accumulator at the piece's bit
/// position, per the OR-merge reassembly rule for straddling loads.
pub fn apply_partial_read(piece: SubRequest, accumulated: u32, new: u32) -> u32 {
    accumulated | (new << piece.bits_before)
}

fn byte_mask(size: u8) -> u32 {
    if size >= 4 {
        u32::MAX
    } else {
        (1u32 << (size * 8)) - 1
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn aligned_request_produces_one_piece() {
        let req = Request {
            addr: 0,
            data: 0x1122_3344,
            we: true,
        };
        let pieces = split(req, 64);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].size, 4);
        assert_eq!(pieces[0].bits_before, 0);
        assert_eq!(pieces[0].data, 0x1122_3344);
    }

    #[test]
    fn straddling_request_produces_two_pieces() {
        // cacheline_size = 64, addr = 62 straddles the boundary at 64.
        let req = Request {
            addr: 62,
            data: 0x1122_3344,
            we: true,
        };
        let pieces = split(req, 64);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].addr, 62);
        assert_eq!(pieces[0].size, 2);
        assert_eq!(pieces[0].bits_before, 0);
        assert_eq!(pieces[0].data, 0x3344);

        assert_eq!(pieces[1].addr, 64);
        assert_eq!(pieces[1].size, 2);
        assert_eq!(pieces[1].bits_before, 16);
        assert_eq!(pieces[1].data, 0x1122);
    }

    #[test]
    fn partial_read_reassembles_straddling_load() {
        let req = Request {
            addr: 62,
            data: 0,
            we: false,
        };
        let pieces = split(req, 64);
        let mut acc = 0u32;
        acc = apply_partial_read(pieces[0], acc, 0x3344);
        acc = apply_partial_read(pieces[1], acc, 0x1122);
        assert_eq!(acc, 0x1122_3344);
    }

    #[test]
    fn pieces_cover_exactly_four_bytes() {
        for addr in [0u32, 1, 15, 60, 61, 62, 63, 64, 1000] {
            let req = Request {
                addr,
                data: 0,
                we: false,
            };
            let pieces = split(req, 16);
            let total: u32 = pieces.iter().map(|p| u32::from(p.size)).sum();
            assert_eq!(total, 4);
            assert!(pieces.len() == 1 || pieces.len() == 2);
        }
    }

    proptest! {
        // Invariant 5 (section 8): split emits 1 or 2 pieces whose byte
        // ranges reconstruct the original 4 bytes, with bits_before values
        // spanning {0, 8 * first_piece.size}.
        #[test]
        fn split_reconstructs_original_word(
            addr in any::<u32>(),
            data in any::<u32>(),
            cacheline_size in (1u32..8).prop_map(|n| n * 16),
        ) {
            let req = Request { addr, data, we: true };
            let pieces = split(req, cacheline_size);

            prop_assert!(pieces.len() == 1 || pieces.len() == 2);
            let total: u32 = pieces.iter().map(|p| u32::from(p.size)).sum();
            prop_assert_eq!(total, 4);
            prop_assert_eq!(pieces[0].bits_before, 0);
            if pieces.len() == 2 {
                prop_assert_eq!(pieces[1].bits_before, 8 * pieces[0].size);
            }

            let mut acc = 0u32;
            for piece in &pieces {
                acc |= piece.data << piece.bits_before;
            }
            prop_assert_eq!(acc, data);
        }
    }
}
