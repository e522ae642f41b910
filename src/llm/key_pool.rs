//! API KEY池：轮换分配KEY，统一节流，并记录各KEY的限流冷却状态

use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

use crate::utils::RequestThrottle;

/// 未给出等待提示时，单个KEY被限流后的冷却时长
pub const DEFAULT_KEY_COOLDOWN: Duration = Duration::from_secs(60);

/// 单个API KEY，Debug输出时做脱敏处理
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// 获取原始KEY，仅在构造请求时使用
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// 脱敏后的KEY，便于日志输出
    pub fn masked(&self) -> String {
        let visible: String = self.0.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        format!("***{}", visible)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ApiKey").field(&self.masked()).finish()
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum KeyPoolError {
    #[error("no usable API key configured")]
    Empty,
}

#[derive(Debug, Default)]
struct RotationState {
    next_index: usize,
    /// KEY下标 -> 冷却结束时刻
    cooldowns: HashMap<usize, Instant>,
}

/// KEY池
///
/// `next_key` 与请求成败无关，始终按轮询顺序返回下一个KEY；
/// 节流以整个池为单位计算，而不是按KEY分别计算。
#[derive(Debug)]
pub struct KeyPool {
    keys: Vec<ApiKey>,
    state: Mutex<RotationState>,
    throttle: RequestThrottle,
}

impl KeyPool {
    pub fn new(keys: Vec<String>, min_interval: Duration) -> Result<Self, KeyPoolError> {
        let keys: Vec<ApiKey> = keys
            .into_iter()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .map(ApiKey::new)
            .collect();

        if keys.is_empty() {
            return Err(KeyPoolError::Empty);
        }

        Ok(Self {
            keys,
            state: Mutex::new(RotationState::default()),
            throttle: RequestThrottle::new(min_interval),
        })
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, RotationState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 轮询返回下一个KEY
    pub fn next_key(&self) -> ApiKey {
        let mut state = self.lock_state();
        let index = state.next_index;
        state.next_index = (index + 1) % self.keys.len();
        self.keys[index].clone()
    }

    /// 取得下一个KEY，并等待全局请求间隔
    pub async fn acquire(&self) -> ApiKey {
        let key = self.next_key();
        self.throttle.wait().await;
        key
    }

    /// 记录某个KEY收到的限流信号
    pub fn record_rate_limit_signal(&self, key: &ApiKey, retry_after: Option<Duration>) {
        let Some(index) = self.keys.iter().position(|candidate| candidate == key) else {
            return;
        };
        let until = Instant::now() + retry_after.unwrap_or(DEFAULT_KEY_COOLDOWN);

        let mut state = self.lock_state();
        let entry = state.cooldowns.entry(index).or_insert(until);
        if *entry < until {
            *entry = until;
        }
    }

    /// 若所有KEY都处于冷却中，返回距离最早恢复的时长
    pub fn exhaustion(&self) -> Option<Duration> {
        let now = Instant::now();
        let state = self.lock_state();

        let mut earliest: Option<Instant> = None;
        for index in 0..self.keys.len() {
            match state.cooldowns.get(&index) {
                Some(until) if *until > now => {
                    earliest = Some(earliest.map_or(*until, |current| current.min(*until)));
                }
                _ => return None,
            }
        }

        earliest.map(|until| until - now)
    }
}
