//! 正文生成阶段：并发生成所有章节，任一章节最终失败则整个运行失败

use std::collections::HashMap;

use futures::{StreamExt, TryStreamExt, stream};

use crate::cache::SECTION_CATEGORY;
use crate::generator::catalog::SectionSpec;
use crate::generator::context::GeneratorContext;
use crate::generator::progress::{ProgressRange, ProgressSlice};
use crate::generator::types::{ReportError, ResearchData, SectionContents};
use crate::search::format_for_prompt;
use crate::utils::text::trimmed_char_count;

/// 执行正文生成阶段
///
/// 每个章节独占 `progress` 区间中等宽的一份；返回结果按目录顺序排列，与完成顺序无关。
pub async fn execute(
    context: &GeneratorContext,
    topic: &str,
    research: &ResearchData,
    progress: &ProgressRange,
) -> Result<SectionContents, ReportError> {
    let sliced = progress.split(context.catalog.len());
    let max_parallels = context.config.llm.max_parallels.max(1);

    let jobs = context.catalog.iter().enumerate().map(|(index, section)| {
        let slice = sliced.slot(index);
        async move {
            let results = research
                .get(&section.name)
                .map(Vec::as_slice)
                .unwrap_or_default();
            let prompt = section.render_prompt(topic, &format_for_prompt(results));
            let content = compose_section(context, section, &prompt, &slice).await?;
            Ok::<_, ReportError>((section.name.clone(), content))
        }
    });

    let mut generated: HashMap<String, String> = stream::iter(jobs)
        .buffer_unordered(max_parallels)
        .try_collect()
        .await?;

    let mut contents = SectionContents::new();
    for section in context.catalog.iter() {
        if let Some(content) = generated.remove(&section.name) {
            contents.insert(section.name.clone(), content);
        }
    }
    Ok(contents)
}

/// 缓存键：影响生成结果的全部输入，包括模型、报告语言与采样参数
fn cache_key(context: &GeneratorContext, prompt: &str) -> String {
    let llm = &context.config.llm;
    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        context.llm_client.model_name(),
        context.config.target_language,
        llm.temperature,
        llm.top_p,
        llm.max_tokens,
        prompt
    )
}

/// 生成单个章节，优先读取缓存
async fn compose_section(
    context: &GeneratorContext,
    section: &SectionSpec,
    prompt: &str,
    slice: &ProgressSlice,
) -> Result<String, ReportError> {
    let cache_key = cache_key(context, prompt);
    let min_chars = context.config.llm.min_content_chars;

    match context
        .cache_manager
        .get::<String>(SECTION_CATEGORY, &cache_key)
        .await
    {
        Ok(Some(content)) if trimmed_char_count(&content) > min_chars => {
            tracing::info!(section = %section.name, "section loaded from cache");
            slice.report(format!("{} loaded from cache", section.name), 1.0);
            return Ok(content);
        }
        Ok(Some(_)) => {
            tracing::debug!(section = %section.name, "cached section too short, regenerating")
        }
        Ok(None) => {}
        Err(e) => tracing::warn!(section = %section.name, error = %e, "cache lookup failed"),
    }

    let report = |message: &str, fraction: f64| slice.report(message, fraction);
    let content = context
        .llm_client
        .generate_section(&section.name, prompt, Some(&report))
        .await
        .map_err(|source| ReportError::SectionGenerationFailed {
            section: section.name.clone(),
            source,
        })?;

    if let Err(e) = context
        .cache_manager
        .set(
            SECTION_CATEGORY,
            &cache_key,
            content.clone(),
            Some(context.llm_client.model_name()),
        )
        .await
    {
        tracing::warn!(section = %section.name, error = %e, "failed to cache section");
    }

    tracing::info!(
        section = %section.name,
        chars = content.chars().count(),
        "section generated"
    );
    Ok(content)
}
