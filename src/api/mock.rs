//! 内存模拟数据源
//!
//! 不依赖网络即可体验完整流程：生成 200 条通话录音，接收名单上传并按
//! 第一个电话号码去重，按 CEP 计算所选名单之间的兼容数据。

use super::MailingApi;
use super::types::{
    CompatiblePage, CompatibleRecord, ListsResponse, MAILING_NAME_FIELD,
    MailingBatchResponse, MailingGeneralStats, MailingListFilter,
    MailingListResponse, MailingStat, MailingStatsFilter,
    MailingStatsResponse, PaginationMeta, Recording, RecordingFilter,
    RecordingsResponse, RowRecord,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

const RECORDING_COUNT: usize = 200;
const DISPOSITIONS: [&str; 4] = ["ANSWERED", "NO ANSWER", "BUSY", "FAILED"];
const LISTS: [Option<&str>; 5] = [
    Some("Mailing_SP_High"),
    Some("Mailing_RJ_Leads"),
    Some("Retorno_Vendas"),
    Some(""),
    None,
];
const PHONE_FIELDS: [&str; 4] = ["telefone1", "telefone2", "telefone3", "telefone4"];
const COMPATIBLE_FIELDS: [&str; 12] = [
    "nome", "cpf", "telefone1", "telefone2", "telefone3", "telefone4", "uf",
    "bairro", "cidade", "endereco", "cep", "numero",
];

/// 一次导入的名单
#[derive(Debug, Default)]
struct StoredMailing {
    rows: Vec<(u64, RowRecord, String)>,
    novos: u64,
    duplicados: u64,
    first_insert: String,
    last_insert: String,
}

#[derive(Debug, Default)]
struct MockState {
    next_id: u64,
    seen_phones: HashSet<String>,
    mailings: BTreeMap<String, StoredMailing>,
}

/// 模拟数据源
pub struct MockMailingApi {
    recordings: Vec<Recording>,
    state: Mutex<MockState>,
    latency: Duration,
}

impl MockMailingApi {
    /// 创建模拟数据源，录音数据使用固定种子生成
    pub fn new() -> Self {
        Self::with_seed(42)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            recordings: generate_recordings(seed, Utc::now()),
            state: Mutex::new(MockState::default()),
            latency: Duration::ZERO,
        }
    }

    /// 为每次调用加入模拟的网络延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    async fn simulate_latency(&self) {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MockMailingApi {
    fn default() -> Self {
        Self::new()
    }
}

fn generate_recordings(seed: u64, now: DateTime<Utc>) -> Vec<Recording> {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = DateTime::parse_from_rfc3339("2023-01-01T00:00:00Z")
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or(now);
    let span = (now - start).num_seconds().max(1);

    (0..RECORDING_COUNT)
        .map(|i| {
            let date = start + ChronoDuration::seconds(rng.gen_range(0..span));
            let iso = date.to_rfc3339_opts(SecondsFormat::Millis, true);
            let duration: i64 = rng.gen_range(0..300);
            Recording {
                id: i as i64 + 1,
                calldate: iso.clone(),
                src: format!("100{}", rng.gen_range(0..10)),
                dst: format!("119{}", rng.gen_range(10_000_000..100_000_000)),
                duration: Value::from(duration),
                billsec: Value::from((duration - 10).max(0)),
                disposition: DISPOSITIONS[rng.gen_range(0..DISPOSITIONS.len())]
                    .to_string(),
                gravacao: rng
                    .gen_bool(0.5)
                    .then(|| "path/to/file.wav".to_string()),
                destino: "SIP/Trunk".to_string(),
                cml_nome: "Campaign A".to_string(),
                lista_nome: LISTS[rng.gen_range(0..LISTS.len())]
                    .map(str::to_string),
                cml_id: 101,
                tipomailing: "active".to_string(),
                usr_nome: format!("Agent_{}", rng.gen_range(0..5)),
                data_insercao: iso,
            }
        })
        .collect()
}

/// 把单元格值转换为比较用的字符串
fn cell_text(row: &RowRecord, key: &str) -> String {
    match row.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn total_pages(total: usize, limit: u32) -> u32 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(limit as usize) as u32
}

fn page_slice<T: Clone>(items: &[T], page: u32, limit: u32) -> Vec<T> {
    let start = (page.max(1) as usize - 1) * limit as usize;
    items.iter().skip(start).take(limit as usize).cloned().collect()
}

#[async_trait]
impl MailingApi for MockMailingApi {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn upload_batch(&self, rows: &[RowRecord]) -> Result<MailingBatchResponse> {
        self.simulate_latency().await;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut state = self.lock();
        let mut novos = 0u64;
        let mut duplicados = 0u64;
        let mut phones = 0u64;

        for row in rows {
            let name = cell_text(row, MAILING_NAME_FIELD);
            phones += PHONE_FIELDS
                .iter()
                .filter(|f| !cell_text(row, f).is_empty())
                .count() as u64;

            let phone = cell_text(row, "telefone1");
            let is_new = phone.is_empty() || state.seen_phones.insert(phone);

            state.next_id += 1;
            let id = state.next_id;
            let mailing = state.mailings.entry(name).or_default();
            if mailing.first_insert.is_empty() {
                mailing.first_insert = now.clone();
            }
            mailing.last_insert = now.clone();
            if is_new {
                novos += 1;
                mailing.novos += 1;
                mailing.rows.push((id, row.clone(), now.clone()));
            } else {
                duplicados += 1;
                mailing.duplicados += 1;
            }
        }

        Ok(MailingBatchResponse {
            message: "Mailing processado".to_string(),
            total_itens: rows.len() as u64,
            total_telefones_processados: phones,
            total_novos_malling: novos,
            total_duplicados_logs: duplicados,
            error: None,
        })
    }

    async fn list_mailings(&self, filter: &MailingListFilter) -> Result<MailingListResponse> {
        self.simulate_latency().await;
        let state = self.lock();
        let needle = filter.nome.to_lowercase();
        let mailings: Vec<String> = state
            .mailings
            .iter()
            .filter(|(name, _)| name.to_lowercase().contains(&needle))
            .filter(|(_, m)| {
                filter.data.is_empty() || m.first_insert.starts_with(&filter.data)
            })
            .map(|(name, _)| name.clone())
            .collect();

        Ok(MailingListResponse {
            success: true,
            total: mailings.len() as u64,
            mailings,
            error: None,
        })
    }

    async fn fetch_compatible_page(
        &self,
        mailings: &[String],
        page: u32,
        limit: u32,
    ) -> Result<CompatiblePage> {
        self.simulate_latency().await;
        let state = self.lock();

        // CEP -> 出现过的名单集合
        let mut cep_owners: HashMap<String, HashSet<&str>> = HashMap::new();
        for name in mailings {
            if let Some(mailing) = state.mailings.get(name) {
                for (_, row, _) in &mailing.rows {
                    let cep = cell_text(row, "cep");
                    if !cep.is_empty() {
                        cep_owners.entry(cep).or_default().insert(name.as_str());
                    }
                }
            }
        }
        let required = if mailings.len() > 1 { 2 } else { 1 };

        let mut matched: Vec<CompatibleRecord> = Vec::new();
        for name in mailings {
            let Some(mailing) = state.mailings.get(name) else { continue };
            for (id, row, inserted) in &mailing.rows {
                let cep = cell_text(row, "cep");
                let shared = cep_owners.get(&cep).map_or(0, HashSet::len);
                if cep.is_empty() || shared < required {
                    continue;
                }
                let mut record = CompatibleRecord::new();
                record.insert("id".to_string(), Value::from(*id));
                for field in COMPATIBLE_FIELDS {
                    record.insert(field.to_string(), Value::from(cell_text(row, field)));
                }
                record.insert("nome_malling".to_string(), Value::from(name.clone()));
                record.insert("data_insercao".to_string(), Value::from(inserted.clone()));
                matched.push(record);
            }
        }

        Ok(CompatiblePage {
            total_registros: matched.len() as u64,
            pagina_atual: page,
            por_pagina: limit,
            total_pages: total_pages(matched.len(), limit),
            dados: page_slice(&matched, page, limit),
            error: None,
        })
    }

    async fn fetch_recordings(&self, filter: &RecordingFilter) -> Result<RecordingsResponse> {
        self.simulate_latency().await;
        let needle = filter.lista_nome.to_lowercase();

        let mut rows: Vec<Recording> = self
            .recordings
            .iter()
            .filter(|r| {
                let has_list =
                    r.lista_nome.as_deref().is_some_and(|l| !l.is_empty());
                if filter.sem_lista {
                    !has_list
                } else {
                    has_list
                        && (needle.is_empty()
                            || r.lista_nome
                                .as_deref()
                                .is_some_and(|l| l.to_lowercase().contains(&needle)))
                }
            })
            .filter(|r| {
                filter
                    .disposition
                    .is_none_or(|d| r.disposition == d.as_str())
            })
            .filter(|r| {
                filter.start_date.is_empty()
                    || r.calldate.as_str() >= filter.start_date.as_str()
            })
            .filter(|r| {
                filter.end_date.is_empty()
                    || r.calldate.as_str() <= filter.end_date.as_str()
            })
            .cloned()
            .collect();

        // 最新的在前
        rows.sort_by(|a, b| b.calldate.cmp(&a.calldate));

        let total = rows.len();
        let pages = total_pages(total, filter.limit);
        Ok(RecordingsResponse {
            total_registros: total as u64,
            filtro_sem_lista: filter.sem_lista,
            dados: page_slice(&rows, filter.page, filter.limit),
            paginacao: Some(PaginationMeta {
                pagina_atual: filter.page,
                por_pagina: filter.limit,
                total_pages: pages,
                tem_proxima_pagina: filter.page < pages,
                tem_pagina_anterior: filter.page > 1,
            }),
        })
    }

    async fn fetch_mailing_stats(
        &self,
        filter: &MailingStatsFilter,
    ) -> Result<MailingStatsResponse> {
        self.simulate_latency().await;
        let state = self.lock();

        let stats: Vec<MailingStat> = state
            .mailings
            .iter()
            .filter(|(_, m)| {
                let day = m.first_insert.get(..10).unwrap_or("");
                (filter.start_date.is_empty() || day >= filter.start_date.as_str())
                    && (filter.end_date.is_empty() || day <= filter.end_date.as_str())
            })
            .map(|(name, m)| {
                let total = m.novos + m.duplicados;
                MailingStat {
                    nome_malling: name.clone(),
                    total_registros: m.novos,
                    total_telefones_unicos: m.novos,
                    total_duplicados: m.duplicados,
                    total_geral: total,
                    taxa_duplicacao: duplication_rate(m.duplicados, total),
                    data_primeira_insercao: m.first_insert.clone(),
                    data_ultima_insercao: m.last_insert.clone(),
                }
            })
            .collect();

        let mut totals = MailingGeneralStats::default();
        for s in &stats {
            totals.total_registros += s.total_registros;
            totals.total_telefones_unicos += s.total_telefones_unicos;
            totals.total_duplicados += s.total_duplicados;
            totals.total_geral += s.total_geral;
        }
        totals.taxa_duplicacao_geral =
            duplication_rate(totals.total_duplicados, totals.total_geral);

        let pages = total_pages(stats.len(), filter.limit);
        Ok(MailingStatsResponse {
            total_mailings: stats.len() as u64,
            total_pages: pages,
            pagina_atual: filter.page,
            por_pagina: filter.limit,
            tem_proxima_pagina: filter.page < pages,
            tem_pagina_anterior: filter.page > 1,
            totais_gerais: totals,
            estatisticas: page_slice(&stats, filter.page, filter.limit),
        })
    }

    async fn fetch_lists(&self) -> Result<ListsResponse> {
        self.simulate_latency().await;
        let mut listas: Vec<String> = self
            .recordings
            .iter()
            .filter_map(|r| r.lista_nome.clone())
            .filter(|l| !l.is_empty())
            .collect();
        listas.sort();
        listas.dedup();
        Ok(ListsResponse { success: true, listas })
    }
}

fn duplication_rate(duplicados: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (duplicados as f64 / total as f64 * 10_000.0).round() / 100.0
    }
}
