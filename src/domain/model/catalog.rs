use crate::domain::model::{ClassTypeId, InstructorId, LevelId, ScheduledClass};
use uuid::Uuid;

/// クラス種別（ヨガ、HIITなど）
#[derive(Debug, Clone, PartialEq)]
pub struct ClassType {
    pub id: ClassTypeId,
    pub name: String,
    pub description: String,
    pub is_active: bool,
}

/// レベル（初級、中級など）
#[derive(Debug, Clone, PartialEq)]
pub struct Level {
    pub id: LevelId,
    pub name: String,
    pub description: String,
    pub difficulty_order: u32,
}

/// インストラクター
#[derive(Debug, Clone, PartialEq)]
pub struct Instructor {
    pub id: InstructorId,
    pub display_name: String,
    pub is_active: bool,
}

/// 表示用に名称を解決済みの開催クラス
#[derive(Debug, Clone)]
pub struct ClassListing {
    pub class: ScheduledClass,
    pub class_type_name: String,
    pub level_name: String,
    pub instructor_name: Option<String>,
}

// 初期データ（migrations/006, 007 と同じID）
const DEFAULT_CLASS_TYPES: [(&str, &str, &str); 4] = [
    ("6f1c2a8e-0d4b-4c1e-9a3f-1b2c3d4e5f60", "Yoga", "Flexibility and breathing"),
    ("7a2d3b9f-1e5c-4d2f-8b4a-2c3d4e5f6071", "HIIT", "High intensity interval training"),
    ("8b3e4c0a-2f6d-4e3a-9c5b-3d4e5f607182", "Pilates", "Core strength and posture"),
    ("9c4f5d1b-3a7e-4f4b-8d6c-4e5f60718293", "Spinning", "Indoor cycling"),
];

const DEFAULT_LEVELS: [(&str, &str, &str, u32); 3] = [
    ("a1b2c3d4-0001-4000-8000-000000000001", "Beginner", "No experience required", 1),
    ("a1b2c3d4-0002-4000-8000-000000000002", "Intermediate", "Regular training", 2),
    ("a1b2c3d4-0003-4000-8000-000000000003", "Advanced", "Experienced athletes", 3),
];

/// 初期登録されるクラス種別
pub fn default_class_types() -> Vec<ClassType> {
    DEFAULT_CLASS_TYPES
        .iter()
        .filter_map(|(id, name, description)| {
            Uuid::parse_str(id).ok().map(|uuid| ClassType {
                id: ClassTypeId::from_uuid(uuid),
                name: name.to_string(),
                description: description.to_string(),
                is_active: true,
            })
        })
        .collect()
}

/// 初期登録されるレベル
pub fn default_levels() -> Vec<Level> {
    DEFAULT_LEVELS
        .iter()
        .filter_map(|(id, name, description, order)| {
            Uuid::parse_str(id).ok().map(|uuid| Level {
                id: LevelId::from_uuid(uuid),
                name: name.to_string(),
                description: description.to_string(),
                difficulty_order: *order,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_complete() {
        assert_eq!(default_class_types().len(), DEFAULT_CLASS_TYPES.len());
        assert_eq!(default_levels().len(), DEFAULT_LEVELS.len());
    }

    #[test]
    fn test_default_levels_are_ordered() {
        let orders: Vec<u32> = default_levels().iter().map(|l| l.difficulty_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }
}
