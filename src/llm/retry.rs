//! 通用重试策略，与KEY轮换解耦，可单独测试

use std::future::Future;
use std::time::Duration;

/// 当前尝试的序号信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 从1开始计数
    pub number: u32,
    pub total: u32,
}

impl Attempt {
    pub fn is_last(&self) -> bool {
        self.number >= self.total
    }

    /// 本次尝试开始时已消耗的重试预算比例
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        f64::from(self.number - 1) / f64::from(self.total)
    }
}

/// 单次尝试失败后的处理方式
#[derive(Debug)]
pub enum AttemptFailure<E> {
    /// 可重试，等待 `wait` 后进行下一次尝试
    Retry { error: E, wait: Duration },
    /// 不可重试，立即终止
    Abort(E),
}

#[derive(Debug)]
pub enum RetryError<E> {
    Exhausted {
        attempts: u32,
        last_error: Option<E>,
    },
    Aborted {
        attempt: u32,
        error: E,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }

    /// 循环执行 `operation`，直到成功、被终止或用尽尝试次数。
    /// 最后一次尝试失败后不再等待。
    pub async fn run<T, E, F, Fut>(&self, mut operation: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = Result<T, AttemptFailure<E>>>,
    {
        let mut last_error = None;

        for number in 1..=self.max_attempts {
            let attempt = Attempt {
                number,
                total: self.max_attempts,
            };

            match operation(attempt).await {
                Ok(value) => return Ok(value),
                Err(AttemptFailure::Abort(error)) => {
                    return Err(RetryError::Aborted {
                        attempt: number,
                        error,
                    });
                }
                Err(AttemptFailure::Retry { error, wait }) => {
                    last_error = Some(error);
                    if !attempt.is_last() && !wait.is_zero() {
                        tokio::time::sleep(wait).await;
                    }
                }
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_attempts,
            last_error,
        })
    }
}
