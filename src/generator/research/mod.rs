//! 检索阶段：为每个章节检索资料，单个章节失败由兜底结果掩盖

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::join_all;

use crate::generator::context::GeneratorContext;
use crate::generator::progress::ProgressRange;
use crate::generator::types::ResearchData;
use crate::search::SearchResult;

/// 执行检索阶段
///
/// 各章节的检索可以并发发出，结果按目录顺序写入。
pub async fn execute(
    context: &GeneratorContext,
    topic: &str,
    progress: &ProgressRange,
) -> ResearchData {
    let total = context.catalog.len();
    let completed = AtomicUsize::new(0);

    let searches = context.catalog.iter().map(|section| {
        let completed = &completed;
        async move {
            let results = context
                .research_client
                .search_section(topic, &section.name)
                .await;
            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
            progress.report(
                format!("Researched {} ({}/{})", section.name, done, total),
                done as f64 / total.max(1) as f64,
            );
            (section.name.clone(), results)
        }
    });

    let research: ResearchData = join_all(searches).await.into_iter().collect();
    tracing::info!(
        sections = research.len(),
        sources = research.values().map(Vec::len).sum::<usize>(),
        "research gathered"
    );
    research
}

/// 汇总所有章节的来源，按URL去重并保留首次出现的顺序
pub fn dedupe_sources(research: &ResearchData) -> Vec<SearchResult> {
    let mut seen = HashSet::new();
    research
        .values()
        .flatten()
        .filter(|result| seen.insert(result.url.clone()))
        .cloned()
        .collect()
}
