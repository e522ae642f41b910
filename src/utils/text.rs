/// 将任意文本转换为适合作为文件名的短标识
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(ch.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        String::from("report")
    } else {
        slug.chars().take(64).collect()
    }
}

/// 统计去除首尾空白后的字符数
pub fn trimmed_char_count(text: &str) -> usize {
    text.trim().chars().count()
}

/// 按字符截断文本，超出部分以省略号表示
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push('…');
    truncated
}
