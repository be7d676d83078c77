//! 用户实体

use serde::{Deserialize, Serialize};
use vita_common::{AuditInfo, UserId};
use vita_domain_core::{AggregateRoot, Entity};

use crate::domain::value_objects::Email;

/// 执业许可（仅医生持有）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicalLicense {
    /// 许可编号
    pub number: String,
    /// 签发地区
    pub region: String,
}

impl MedicalLicense {
    pub fn new(number: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            region: region.into(),
        }
    }
}

/// 用户角色（封闭变体：许可信息当且仅当医生角色存在）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Role {
    Patient,
    Doctor { license: MedicalLicense },
}

impl Role {
    pub fn is_patient(&self) -> bool {
        matches!(self, Self::Patient)
    }

    pub fn is_doctor(&self) -> bool {
        matches!(self, Self::Doctor { .. })
    }

    pub fn license(&self) -> Option<&MedicalLicense> {
        match self {
            Self::Patient => None,
            Self::Doctor { license } => Some(license),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Doctor { .. } => "doctor",
        }
    }
}

/// 用户实体
///
/// 角色在创建后不可变更：实体不提供任何角色修改方法。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: Email,
    pub full_name: String,
    pub role: Role,
    /// 身份证件号（巴西 CPF）
    pub national_id: Option<String>,
    pub phone: Option<String>,
    pub audit_info: AuditInfo,
}

impl User {
    pub fn new(email: Email, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: UserId::new(),
            email,
            full_name: full_name.into(),
            role,
            national_id: None,
            phone: None,
            audit_info: AuditInfo::new(),
        }
    }

    pub fn with_national_id(mut self, national_id: impl Into<String>) -> Self {
        self.national_id = Some(national_id.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn is_patient(&self) -> bool {
        self.role.is_patient()
    }

    pub fn is_doctor(&self) -> bool {
        self.role.is_doctor()
    }
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl AggregateRoot for User {
    fn audit_info(&self) -> &AuditInfo {
        &self.audit_info
    }

    fn audit_info_mut(&mut self) -> &mut AuditInfo {
        &mut self.audit_info
    }
}
