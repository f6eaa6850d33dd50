use std::collections::BTreeSet;
use std::sync::Arc;

use repeatexec_error::{DbError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::arrays::bitmap::Bitmap;
use crate::arrays::row::encoding::integer_fits;
use crate::arrays::row::layout::{DescriptorTable, SlotDescriptor, SlotId, TupleId, TupleLayout};
use crate::expr::PhysicalScalarExpression;

/// Planner-provided description of a repeat node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepeatNodeDescriptor {
    /// Slots that may be nulled out by some combination.
    pub grouping_slots: BTreeSet<SlotId>,
    /// Per combination, the grouping slots that keep their value.
    pub keep_sets: Vec<BTreeSet<SlotId>>,
    /// Identifier for each combination. Only used for display.
    pub repeat_ids: Vec<i64>,
    /// Indicator columns. Each inner vec holds one value per combination.
    pub grouping_list: Vec<Vec<i64>>,
    /// Layout of the output rows.
    pub output_tuple_id: TupleId,
}

/// Membership of value slots in a set of slot ids.
///
/// Backed by a bitmap indexed by value slot position, so its size depends
/// only on the number of value slots and not on the slot ids themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSet {
    bitmap: Bitmap,
}

impl SlotSet {
    fn new(value_slots: &[SlotDescriptor], ids: &BTreeSet<SlotId>) -> Self {
        let positions = value_slots
            .iter()
            .enumerate()
            .filter_map(|(pos, slot)| ids.contains(&slot.id).then_some(pos));
        SlotSet {
            bitmap: Bitmap::from_indices(value_slots.len(), positions),
        }
    }

    /// Check if the value slot at `pos` is in the set.
    pub fn contains(&self, pos: usize) -> bool {
        self.bitmap.value_or_false(pos)
    }
}

/// Validated, immutable configuration for expanding rows.
#[derive(Debug)]
pub struct GroupingPlan {
    descriptor: RepeatNodeDescriptor,
    output_layout: Arc<TupleLayout>,
    num_value_slots: usize,
    /// Per combination, the value slot positions that are forced null.
    null_masks: Vec<Bitmap>,
}

impl GroupingPlan {
    /// Validate the descriptor against the output layout and the value
    /// expressions, and precompute per-combination null masks.
    ///
    /// All failures are initialization errors.
    pub fn try_new(
        descriptor: RepeatNodeDescriptor,
        descriptors: &DescriptorTable,
        exprs: &[PhysicalScalarExpression],
    ) -> Result<Self> {
        let layout = descriptors
            .get_tuple_layout(descriptor.output_tuple_id)
            .ok_or_else(|| {
                DbError::initialization("Failed to get tuple descriptor")
                    .with_field("tuple_id", descriptor.output_tuple_id)
            })?;

        let num_combinations = descriptor.keep_sets.len();
        if num_combinations == 0 {
            return Err(DbError::initialization(
                "Repeat requires at least one grouping combination",
            ));
        }
        if descriptor.repeat_ids.len() != num_combinations {
            return Err(DbError::initialization(
                "Number of repeat ids does not match number of combinations",
            )
            .with_field("repeat_ids", descriptor.repeat_ids.len())
            .with_field("combinations", num_combinations));
        }
        for (idx, column) in descriptor.grouping_list.iter().enumerate() {
            if column.len() != num_combinations {
                return Err(DbError::initialization(
                    "Grouping indicator length does not match number of combinations",
                )
                .with_field("indicator", idx)
                .with_field("len", column.len())
                .with_field("combinations", num_combinations));
            }
        }

        if exprs.is_empty() {
            return Err(DbError::initialization("Repeat requires at least one value expression"));
        }
        let num_value_slots = exprs.len();
        let expected_slots = num_value_slots + descriptor.grouping_list.len();
        if layout.num_slots() != expected_slots {
            return Err(DbError::initialization(
                "Output layout does not match value expressions and grouping indicators",
            )
            .with_field("layout_slots", layout.num_slots())
            .with_field("value_exprs", num_value_slots)
            .with_field("indicators", descriptor.grouping_list.len()));
        }

        for (idx, keep) in descriptor.keep_sets.iter().enumerate() {
            if !keep.is_subset(&descriptor.grouping_slots) {
                return Err(DbError::initialization(
                    "Keep set contains slots not in the grouping slots",
                )
                .with_field("combination", idx));
            }
        }

        let (value_slots, indicator_slots) = layout.slots().split_at(num_value_slots);
        let grouping = SlotSet::new(value_slots, &descriptor.grouping_slots);

        for (pos, (slot, expr)) in value_slots.iter().zip(exprs).enumerate() {
            if slot.datatype != expr.datatype() {
                return Err(DbError::initialization(
                    "Value expression type does not match output slot",
                )
                .with_field("slot", slot.id)
                .with_field("slot_type", slot.datatype)
                .with_field("expr_type", expr.datatype()));
            }
            if grouping.contains(pos) && !slot.nullable {
                return Err(DbError::initialization("Grouping slot must be nullable")
                    .with_field("slot", slot.id));
            }
        }

        for (slot, column) in indicator_slots.iter().zip(&descriptor.grouping_list) {
            if !slot.datatype.is_integer() {
                return Err(DbError::initialization("Grouping indicator slot must be an integer")
                    .with_field("slot", slot.id)
                    .with_field("datatype", slot.datatype));
            }
            if let Some(v) = column.iter().find(|&&v| !integer_fits(slot.datatype, v)) {
                return Err(DbError::initialization(
                    "Grouping indicator value does not fit in slot type",
                )
                .with_field("slot", slot.id)
                .with_field("datatype", slot.datatype)
                .with_field("value", v));
            }
        }

        for id in &descriptor.grouping_slots {
            if !value_slots.iter().any(|s| s.id == *id) {
                warn!(slot = %id, "grouping slot not present in repeat output");
            }
        }

        let null_masks = descriptor
            .keep_sets
            .iter()
            .map(|keep| {
                let keep = SlotSet::new(value_slots, keep);
                let forced =
                    (0..num_value_slots).filter(|&pos| grouping.contains(pos) && !keep.contains(pos));
                Bitmap::from_indices(num_value_slots, forced)
            })
            .collect();

        Ok(GroupingPlan {
            output_layout: Arc::new(layout.clone()),
            descriptor,
            num_value_slots,
            null_masks,
        })
    }

    pub fn descriptor(&self) -> &RepeatNodeDescriptor {
        &self.descriptor
    }

    pub fn output_layout(&self) -> &Arc<TupleLayout> {
        &self.output_layout
    }

    pub fn num_combinations(&self) -> usize {
        self.null_masks.len()
    }

    pub fn num_value_slots(&self) -> usize {
        self.num_value_slots
    }

    /// Value slot positions forced null for the given combination.
    pub fn null_mask(&self, combination: usize) -> &Bitmap {
        &self.null_masks[combination]
    }

    /// Indicator values for the given combination, in output slot order.
    pub fn indicator_values(&self, combination: usize) -> impl Iterator<Item = i64> + '_ {
        self.descriptor
            .grouping_list
            .iter()
            .map(move |column| column[combination])
    }
}

#[cfg(test)]
mod tests {
    use repeatexec_error::ErrorKind;

    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::column_expr::PhysicalColumnExpr;

    fn ids(ids: &[u32]) -> BTreeSet<SlotId> {
        ids.iter().map(|&id| SlotId(id)).collect()
    }

    /// Output (a: #0, b: #1, c: #2, g: #3), grouping on a and b.
    fn table(indicator_type: DataType, b_nullable: bool) -> DescriptorTable {
        DescriptorTable::new([TupleLayout::new(
            5,
            [
                SlotDescriptor::new(0, DataType::Int32, true),
                SlotDescriptor::new(1, DataType::Int32, b_nullable),
                SlotDescriptor::new(2, DataType::Utf8, false),
                SlotDescriptor::new(3, indicator_type, false),
            ],
        )])
        .unwrap()
    }

    fn exprs() -> Vec<PhysicalScalarExpression> {
        vec![
            PhysicalColumnExpr::new(0, DataType::Int32).into(),
            PhysicalColumnExpr::new(1, DataType::Int32).into(),
            PhysicalColumnExpr::new(2, DataType::Utf8).into(),
        ]
    }

    fn descriptor() -> RepeatNodeDescriptor {
        RepeatNodeDescriptor {
            grouping_slots: ids(&[0, 1]),
            keep_sets: vec![ids(&[0, 1]), ids(&[0]), ids(&[])],
            repeat_ids: vec![0, 1, 3],
            grouping_list: vec![vec![0, 1, 3]],
            output_tuple_id: TupleId(5),
        }
    }

    fn init_err(desc: RepeatNodeDescriptor, table: &DescriptorTable) -> DbError {
        let err = GroupingPlan::try_new(desc, table, &exprs()).unwrap_err();
        assert_eq!(ErrorKind::Initialization, err.kind(), "{err}");
        err
    }

    #[test]
    fn rollup_null_masks() {
        let plan =
            GroupingPlan::try_new(descriptor(), &table(DataType::Int64, true), &exprs()).unwrap();

        assert_eq!(3, plan.num_combinations());
        assert_eq!(3, plan.num_value_slots());
        assert_eq!(Vec::<usize>::new(), plan.null_mask(0).index_iter().collect::<Vec<_>>());
        assert_eq!(vec![1], plan.null_mask(1).index_iter().collect::<Vec<_>>());
        assert_eq!(vec![0, 1], plan.null_mask(2).index_iter().collect::<Vec<_>>());
        assert_eq!(vec![3], plan.indicator_values(2).collect::<Vec<_>>());
    }

    #[test]
    fn missing_layout() {
        let mut desc = descriptor();
        desc.output_tuple_id = TupleId(9);
        let err = init_err(desc, &table(DataType::Int64, true));
        assert_eq!("Failed to get tuple descriptor", err.get_msg());
    }

    #[test]
    fn inconsistent_sizes() {
        let table = table(DataType::Int64, true);

        let mut desc = descriptor();
        desc.keep_sets.clear();
        desc.repeat_ids.clear();
        desc.grouping_list = vec![vec![]];
        init_err(desc, &table);

        let mut desc = descriptor();
        desc.repeat_ids.pop();
        init_err(desc, &table);

        let mut desc = descriptor();
        desc.grouping_list[0].push(7);
        init_err(desc, &table);

        let mut desc = descriptor();
        desc.grouping_list.push(vec![1, 2, 3]);
        init_err(desc, &table);
    }

    #[test]
    fn keep_set_not_subset() {
        let mut desc = descriptor();
        desc.keep_sets[1] = ids(&[2]);
        init_err(desc, &table(DataType::Int64, true));
    }

    #[test]
    fn grouping_slot_not_nullable() {
        init_err(descriptor(), &table(DataType::Int64, false));
    }

    #[test]
    fn indicator_type_checks() {
        init_err(descriptor(), &table(DataType::Utf8, true));

        let mut desc = descriptor();
        desc.grouping_list = vec![vec![0, 1, 300]];
        init_err(desc, &table(DataType::Int8, true));

        let mut desc = descriptor();
        desc.grouping_list = vec![vec![0, 1, 127]];
        GroupingPlan::try_new(desc, &table(DataType::Int8, true), &exprs()).unwrap();
    }

    #[test]
    fn expr_type_mismatch() {
        let exprs: Vec<PhysicalScalarExpression> = vec![
            PhysicalColumnExpr::new(0, DataType::Int32).into(),
            PhysicalColumnExpr::new(1, DataType::Int64).into(),
            PhysicalColumnExpr::new(2, DataType::Utf8).into(),
        ];
        let err = GroupingPlan::try_new(descriptor(), &table(DataType::Int64, true), &exprs)
            .unwrap_err();
        assert_eq!(ErrorKind::Initialization, err.kind());
    }

    #[test]
    fn no_value_exprs() {
        let err = GroupingPlan::try_new(descriptor(), &table(DataType::Int64, true), &[])
            .unwrap_err();
        assert_eq!(ErrorKind::Initialization, err.kind());
    }

    #[test]
    fn sparse_slot_ids() {
        let big = u32::MAX - 1;
        let table = DescriptorTable::new([TupleLayout::new(
            5,
            [
                SlotDescriptor::new(big, DataType::Int32, true),
                SlotDescriptor::new(3, DataType::Int64, false),
            ],
        )])
        .unwrap();
        let desc = RepeatNodeDescriptor {
            grouping_slots: ids(&[big, big - 7]),
            keep_sets: vec![ids(&[big]), ids(&[big - 7])],
            repeat_ids: vec![0, 1],
            grouping_list: vec![vec![0, 1]],
            output_tuple_id: TupleId(5),
        };
        let exprs: [PhysicalScalarExpression; 1] =
            [PhysicalColumnExpr::new(0, DataType::Int32).into()];

        let plan = GroupingPlan::try_new(desc, &table, &exprs).unwrap();
        assert_eq!(1, plan.null_mask(0).len());
        assert!(!plan.null_mask(0).value(0));
        assert!(plan.null_mask(1).value(0));
    }

    #[test]
    fn descriptor_from_json() {
        let json = r#"{
            "grouping_slots": [0, 1],
            "keep_sets": [[0, 1], [0], []],
            "repeat_ids": [0, 1, 3],
            "grouping_list": [[0, 1, 3]],
            "output_tuple_id": 5
        }"#;
        let desc: RepeatNodeDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor(), desc);
    }
}
