use chrono::Local;

pub fn current_timestamp() -> String {
    Local::now().format("%H:%M:%S%.3f").to_string()
}

/// 可打印字符原样输出，其余字节转成 `\xx`
pub fn printable(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if (0x20..=0x7e).contains(&b) || b == b'\n' {
            out.push(b as char);
        } else {
            out.push_str(&format!("\\{:x}", b));
        }
    }
    out
}
