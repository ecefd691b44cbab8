//! 远程 API 的请求与响应类型
//!
//! 字段名与服务端保持一致（葡萄牙语），通过 serde 重命名映射到 Rust 命名。

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 表格中的一行：列名 → 单元格值，保持列顺序
pub type RowRecord = Map<String, Value>;

/// 兼容数据中的一行，字段顺序与服务端返回一致
pub type CompatibleRecord = Map<String, Value>;

/// 上传前注入到每一行的名单名称字段
pub const MAILING_NAME_FIELD: &str = "malling_name";

/// 批次上传请求体
#[derive(Debug, Clone, Serialize)]
pub struct MailingBatchRequest<'a> {
    pub data: &'a [RowRecord],
}

/// 批次上传响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailingBatchResponse {
    pub message: String,
    #[serde(rename = "totalItens")]
    pub total_itens: u64,
    #[serde(rename = "totalTelefonesProcessados")]
    pub total_telefones_processados: u64,
    #[serde(rename = "totalNovosMalling")]
    pub total_novos_malling: u64,
    #[serde(rename = "totalDuplicadosLogs")]
    pub total_duplicados_logs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 名单名称列表的查询条件
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MailingListFilter {
    /// 名称子串
    pub nome: String,
    /// 导入日期（YYYY-MM-DD）
    pub data: String,
}

impl MailingListFilter {
    /// 转换为查询参数，空字段不发送
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if !self.nome.is_empty() {
            query.push(("nome", self.nome.clone()));
        }
        if !self.data.is_empty() {
            query.push(("data", self.data.clone()));
        }
        query
    }
}

/// 名单名称列表响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailingListResponse {
    pub success: bool,
    pub mailings: Vec<String>,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 兼容数据分页请求体
#[derive(Debug, Clone, Serialize)]
pub struct CompatibleRequest<'a> {
    pub mailings: &'a [String],
    pub page: u32,
    pub limit: u32,
}

/// 兼容数据的一页
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatiblePage {
    #[serde(rename = "totalRegistros")]
    pub total_registros: u64,
    #[serde(rename = "paginaAtual")]
    pub pagina_atual: u32,
    #[serde(rename = "porPagina")]
    pub por_pagina: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    pub dados: Vec<CompatibleRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 分页元信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationMeta {
    #[serde(rename = "paginaAtual")]
    pub pagina_atual: u32,
    #[serde(rename = "porPagina")]
    pub por_pagina: u32,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(rename = "temProximaPagina")]
    pub tem_proxima_pagina: bool,
    #[serde(rename = "temPaginaAnterior")]
    pub tem_pagina_anterior: bool,
}

/// 通话的最终结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Disposition {
    #[serde(rename = "ANSWERED")]
    Answered,
    #[serde(rename = "NO ANSWER")]
    NoAnswer,
    #[serde(rename = "BUSY")]
    Busy,
    #[serde(rename = "FAILED")]
    Failed,
}

impl Disposition {
    /// 全部取值
    pub const ALL: [Disposition; 4] = [
        Disposition::Answered,
        Disposition::NoAnswer,
        Disposition::Busy,
        Disposition::Failed,
    ];

    /// 服务端使用的字符串
    pub fn as_str(&self) -> &'static str {
        match self {
            Disposition::Answered => "ANSWERED",
            Disposition::NoAnswer => "NO ANSWER",
            Disposition::Busy => "BUSY",
            Disposition::Failed => "FAILED",
        }
    }

    /// 面板上显示的名称
    pub fn label(&self) -> &'static str {
        match self {
            Disposition::Answered => "Atendidas",
            Disposition::NoAnswer => "Não Atendidas",
            Disposition::Busy => "Ocupado",
            Disposition::Failed => "Falha",
        }
    }
}

impl std::str::FromStr for Disposition {
    type Err = crate::error::CallMetricsError;

    fn from_str(s: &str) -> crate::error::Result<Self> {
        Disposition::ALL
            .into_iter()
            .find(|d| d.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                crate::error::CallMetricsError::config_error(format!("未知的通话结果: {s}"))
            })
    }
}

/// 通话录音查询条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingFilter {
    pub start_date: String,
    pub end_date: String,
    pub lista_nome: String,
    pub disposition: Option<Disposition>,
    /// 只看没有拨号列表的通话
    pub sem_lista: bool,
    pub page: u32,
    pub limit: u32,
}

impl Default for RecordingFilter {
    fn default() -> Self {
        Self {
            start_date: String::new(),
            end_date: String::new(),
            lista_nome: String::new(),
            disposition: None,
            sem_lista: false,
            page: 1,
            limit: 15,
        }
    }
}

impl RecordingFilter {
    /// 转换为查询参数：空字符串不发送，`sem_lista`、`page`、`limit` 总是发送
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if !self.start_date.is_empty() {
            query.push(("start_date", self.start_date.clone()));
        }
        if !self.end_date.is_empty() {
            query.push(("end_date", self.end_date.clone()));
        }
        if !self.lista_nome.is_empty() {
            query.push(("lista_nome", self.lista_nome.clone()));
        }
        if let Some(disposition) = self.disposition {
            query.push(("disposition", disposition.as_str().to_string()));
        }
        query.push(("sem_lista", self.sem_lista.to_string()));
        query.push(("page", self.page.to_string()));
        query.push(("limit", self.limit.to_string()));
        query
    }
}

/// 单条通话录音
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recording {
    pub id: i64,
    pub calldate: String,
    pub src: String,
    pub dst: String,
    /// "HH:MM:SS" 字符串或秒数
    pub duration: Value,
    pub billsec: Value,
    pub disposition: String,
    pub gravacao: Option<String>,
    pub destino: String,
    pub cml_nome: String,
    pub lista_nome: Option<String>,
    pub cml_id: i64,
    pub tipomailing: String,
    pub usr_nome: String,
    pub data_insercao: String,
}

/// 通话录音列表响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingsResponse {
    #[serde(rename = "totalRegistros")]
    pub total_registros: u64,
    pub filtro_sem_lista: bool,
    pub dados: Vec<Recording>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paginacao: Option<PaginationMeta>,
}

/// 名单导入统计查询条件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailingStatsFilter {
    pub start_date: String,
    pub end_date: String,
    pub page: u32,
    pub limit: u32,
}

impl Default for MailingStatsFilter {
    fn default() -> Self {
        Self {
            start_date: String::new(),
            end_date: String::new(),
            page: 1,
            limit: 15,
        }
    }
}

impl MailingStatsFilter {
    /// 转换为查询参数
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        if !self.start_date.is_empty() {
            query.push(("start_date", self.start_date.clone()));
        }
        if !self.end_date.is_empty() {
            query.push(("end_date", self.end_date.clone()));
        }
        query.push(("page", self.page.to_string()));
        query.push(("limit", self.limit.to_string()));
        query
    }
}

/// 单个名单的导入统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailingStat {
    pub nome_malling: String,
    pub total_registros: u64,
    pub total_telefones_unicos: u64,
    pub total_duplicados: u64,
    pub total_geral: u64,
    pub taxa_duplicacao: f64,
    pub data_primeira_insercao: String,
    pub data_ultima_insercao: String,
}

/// 所有名单的汇总统计
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailingGeneralStats {
    pub total_registros: u64,
    pub total_telefones_unicos: u64,
    pub total_duplicados: u64,
    pub total_geral: u64,
    pub taxa_duplicacao_geral: f64,
}

/// 名单导入统计响应
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MailingStatsResponse {
    #[serde(rename = "totalMailings")]
    pub total_mailings: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u32,
    #[serde(rename = "paginaAtual")]
    pub pagina_atual: u32,
    #[serde(rename = "porPagina")]
    pub por_pagina: u32,
    #[serde(rename = "temProximaPagina")]
    pub tem_proxima_pagina: bool,
    #[serde(rename = "temPaginaAnterior")]
    pub tem_pagina_anterior: bool,
    #[serde(rename = "totaisGerais")]
    pub totais_gerais: MailingGeneralStats,
    pub estatisticas: Vec<MailingStat>,
}

/// 拨号列表名称响应
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListsResponse {
    pub success: bool,
    #[serde(alias = "dados")]
    pub listas: Vec<String>,
}
