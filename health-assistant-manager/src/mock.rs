//! Fixed payloads served until a records backend exists

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub id: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub doctor: String,
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Appointment {
    pub id: String,
    pub doctor: String,
    pub department: String,
    pub date: String,
    pub time: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub blood_pressure: String,
    pub heart_rate: u32,
    pub temperature: f64,
    pub last_update: String,
}

pub fn health_records() -> Vec<HealthRecord> {
    vec![
        HealthRecord {
            id: "1".to_string(),
            date: "2024-01-15".to_string(),
            kind: "体检报告".to_string(),
            doctor: "张医生".to_string(),
            summary: "常规体检，各项指标正常".to_string(),
        },
        HealthRecord {
            id: "2".to_string(),
            date: "2024-01-10".to_string(),
            kind: "血压测量".to_string(),
            doctor: "系统记录".to_string(),
            summary: "血压：120/80 mmHg".to_string(),
        },
    ]
}

pub fn appointments() -> Vec<Appointment> {
    vec![Appointment {
        id: "1".to_string(),
        doctor: "张医生".to_string(),
        department: "内科".to_string(),
        date: "2024-01-20".to_string(),
        time: "10:00".to_string(),
        status: "已预约".to_string(),
    }]
}

pub fn health_data() -> HealthData {
    HealthData {
        blood_pressure: "120/80".to_string(),
        heart_rate: 72,
        temperature: 36.5,
        last_update: "2024-01-19".to_string(),
    }
}
