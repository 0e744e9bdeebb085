//! Property-based checks for the sequence layout arithmetic.

use proptest::prelude::*;
use rng_core::SequenceLayout;

fn layouts() -> impl Strategy<Value = SequenceLayout> {
    (1usize..64, 1u64..16, 0u32..12).prop_map(|(block_size, blocks, max_id)| {
        // Allow a ragged tail so files are not always whole multiples of a block.
        let max_values = block_size as u64 * blocks + (blocks % 3);
        SequenceLayout::new(block_size, max_values, max_id).unwrap()
    })
}

proptest! {
    #[test]
    fn locate_stays_within_bounds(layout in layouts(), start in 0u32..12, position in 0u64..1_000_000) {
        let start = start % (layout.max_sequence_id() + 1);
        let location = layout.locate(start, position);

        prop_assert!(location.sequence_id <= layout.max_sequence_id());
        prop_assert!(location.block_number < layout.blocks_per_file());
        prop_assert!(location.index < layout.block_size());
        prop_assert!(!layout.needs_rollover(location.block_number));
    }

    #[test]
    fn position_of_recovers_flat_position(layout in layouts(), position in 0u64..1_000_000) {
        let unadjusted = layout.block_number_of(position);
        let location = layout.locate(0, position);
        let recovered = layout.position_of(
            layout.sequence_offset_for(unadjusted),
            location.block_number,
            location.index,
        );
        prop_assert_eq!(recovered, position);
    }

    #[test]
    fn consecutive_positions_advance_monotonically(layout in layouts(), position in 0u64..1_000_000) {
        let here = layout.locate(0, position);
        let next = layout.locate(0, position + 1);

        if here.index + 1 < layout.block_size() {
            prop_assert_eq!(next.sequence_id, here.sequence_id);
            prop_assert_eq!(next.block_number, here.block_number);
            prop_assert_eq!(next.index, here.index + 1);
        } else if layout.needs_rollover(here.block_number + 1) {
            prop_assert_eq!(next.sequence_id, layout.next_sequence_id(here.sequence_id));
            prop_assert_eq!(next.block_number, 0);
            prop_assert_eq!(next.index, 0);
        } else {
            prop_assert_eq!(next.sequence_id, here.sequence_id);
            prop_assert_eq!(next.block_number, here.block_number + 1);
            prop_assert_eq!(next.index, 0);
        }
    }
}
