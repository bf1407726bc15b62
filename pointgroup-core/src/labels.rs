//! ScanNet v2 label tables
//!
//! The network predicts 20 semantic classes indexed `0..20`. Output files and
//! ground truth use NYU40 ids, and instance evaluation ignores the two
//! "stuff" classes (wall, floor).

/// NYU40 id of each of the 20 predicted semantic classes
pub const SEMANTIC_LABEL_IDS: [u32; 20] = [
    1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 14, 16, 24, 28, 33, 34, 36, 39,
];

/// Names of the 20 semantic classes, aligned with [`SEMANTIC_LABEL_IDS`]
pub const SEMANTIC_CLASS_NAMES: [&str; 20] = [
    "wall",
    "floor",
    "cabinet",
    "bed",
    "chair",
    "sofa",
    "table",
    "door",
    "window",
    "bookshelf",
    "picture",
    "counter",
    "desk",
    "curtain",
    "refrigerator",
    "shower curtain",
    "toilet",
    "sink",
    "bathtub",
    "otherfurniture",
];

/// NYU40 ids of the instance classes
pub const INSTANCE_LABEL_IDS: [u32; 18] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 14, 16, 24, 28, 33, 34, 36, 39,
];

/// Names of the instance classes, aligned with [`INSTANCE_LABEL_IDS`]
pub const INSTANCE_CLASS_NAMES: [&str; 18] = [
    "cabinet",
    "bed",
    "chair",
    "sofa",
    "table",
    "door",
    "window",
    "bookshelf",
    "picture",
    "counter",
    "desk",
    "curtain",
    "refrigerator",
    "shower curtain",
    "toilet",
    "sink",
    "bathtub",
    "otherfurniture",
];

/// Ground-truth ids encode `label_id * 1000 + instance_index`
pub const GT_LABEL_DIVISOR: u32 = 1000;

/// Map a predicted semantic class index to its NYU40 id
pub fn semantic_to_label_id(semantic: usize) -> Option<u32> {
    SEMANTIC_LABEL_IDS.get(semantic).copied()
}

/// Position of an NYU40 id among the instance classes
pub fn instance_class_index(label_id: u32) -> Option<usize> {
    INSTANCE_LABEL_IDS.iter().position(|&id| id == label_id)
}

pub fn instance_class_name(label_id: u32) -> Option<&'static str> {
    instance_class_index(label_id).map(|i| INSTANCE_CLASS_NAMES[i])
}

pub fn is_instance_label(label_id: u32) -> bool {
    instance_class_index(label_id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_mapping() {
        assert_eq!(semantic_to_label_id(0), Some(1));
        assert_eq!(semantic_to_label_id(12), Some(14));
        assert_eq!(semantic_to_label_id(19), Some(39));
        assert_eq!(semantic_to_label_id(20), None);
    }

    #[test]
    fn test_instance_classes_exclude_stuff() {
        assert!(!is_instance_label(1));
        assert!(!is_instance_label(2));
        assert!(is_instance_label(3));
        assert_eq!(instance_class_name(39), Some("otherfurniture"));
        assert_eq!(instance_class_name(13), None);
    }

    #[test]
    fn test_tables_aligned() {
        for (i, id) in INSTANCE_LABEL_IDS.iter().enumerate() {
            let sem = SEMANTIC_LABEL_IDS.iter().position(|s| s == id).unwrap();
            assert_eq!(SEMANTIC_CLASS_NAMES[sem], INSTANCE_CLASS_NAMES[i]);
        }
    }
}
