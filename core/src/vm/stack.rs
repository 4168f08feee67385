use tracing::debug;

use super::StackFrame;
use crate::fault::Fault;

/// 一次外部调用链上的活动帧。
///
/// - 只暴露栈顶帧；
/// - 深度超过 `max_depth` 时报 `StackOverflow`，而不是耗尽宿主栈。
#[derive(Debug)]
pub struct ControlStack {
    frames: Vec<StackFrame>,
    max_depth: usize,
}

impl ControlStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            frames: Vec::new(),
            max_depth,
        }
    }

    pub fn push(&mut self, frame: StackFrame) -> Result<(), Fault> {
        if self.frames.len() >= self.max_depth {
            return Err(Fault::StackOverflow {
                depth: self.frames.len(),
            });
        }
        debug!(unit = frame.unit(), depth = self.frames.len() + 1, "push frame");
        self.frames.push(frame);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<StackFrame, Fault> {
        let frame = self.frames.pop().ok_or(Fault::EmptyStack)?;
        debug!(unit = frame.unit(), depth = self.frames.len(), "pop frame");
        Ok(frame)
    }

    #[inline]
    pub fn current(&self) -> Result<&StackFrame, Fault> {
        self.frames.last().ok_or(Fault::EmptyStack)
    }

    #[inline]
    pub fn current_mut(&mut self) -> Result<&mut StackFrame, Fault> {
        self.frames.last_mut().ok_or(Fault::EmptyStack)
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// 活动帧的单元名，最内层在最后。
    pub fn trace(&self) -> Vec<String> {
        self.frames.iter().map(|f| f.unit().to_string()).collect()
    }
}
