//! Entry points for generated code and embedders
//!
//! Faults only unwind through [`TaskEntry`] functions and [`raise`]. Other fallible entry points
//! return the fault's stable code with 0 meaning success.

use crate::boxed::heap::root::RootHandle;
use crate::fault::{Fault, FaultCode, Result};
use crate::task::Task;
use crate::word::Word;

pub type TaskEntry = extern "C-unwind" fn(&mut Task);

fn fault_code(result: Result<()>) -> u8 {
    match result {
        Ok(()) => 0,
        Err(fault) => {
            log::debug!("returning fault {} to caller", fault);
            fault.code().code()
        }
    }
}

/// Runs `entry` in a new task with the default configuration
///
/// Returns the code of the fault that ended the task or 0. Panics other than faults abort the
/// process.
#[export_name = "tagword_runtime_launch_task"]
pub extern "C" fn launch_task(entry: TaskEntry) -> u8 {
    let mut task = Task::default();
    fault_code(task.run(|task| {
        entry(task);
        Ok(())
    }))
}

/// Raises a fault from generated code
///
/// This must only be called beneath [`launch_task`].
#[export_name = "tagword_runtime_raise"]
pub extern "C-unwind" fn raise(code: u8, operand: Word) -> ! {
    let fault = match FaultCode::from_code(code) {
        Some(code) => Fault::new(code).with_operand(operand),
        None => Fault::new(FaultCode::BadArgumentType).with_operand(Word::fix(code as isize)),
    };

    fault.raise()
}

#[export_name = "tagword_runtime_reserve"]
pub extern "C" fn reserve(task: &mut Task, words: usize) -> u8 {
    fault_code(task.reserve(words))
}

#[export_name = "tagword_runtime_stack_overflow_check"]
pub extern "C" fn stack_overflow_check(task: &Task) -> u8 {
    fault_code(task.stack_overflow_check())
}

#[export_name = "tagword_runtime_mutate"]
pub extern "C" fn mutate(task: &mut Task, block: Word, index: usize, value: Word) -> Word {
    task.heap_mut().mutate(block, index, value)
}

#[export_name = "tagword_runtime_register_root"]
pub extern "C" fn register_root(task: &mut Task, value: Word, finalizable: bool) -> RootHandle {
    task.heap_mut().register_root(value, finalizable)
}

/// Deletes a root returning `false` if it was already deleted
#[export_name = "tagword_runtime_delete_root"]
pub extern "C" fn delete_root(task: &mut Task, handle: RootHandle) -> bool {
    task.heap_mut().delete_root(handle).is_some()
}

/// Returns the value of a root or the unbound marker if it was deleted
#[export_name = "tagword_runtime_root_value"]
pub extern "C" fn root_value(task: &Task, handle: RootHandle) -> Word {
    task.heap().root_value(handle).unwrap_or(Word::UNBOUND)
}

#[export_name = "tagword_runtime_set_root"]
pub extern "C" fn set_root(task: &mut Task, handle: RootHandle, value: Word) -> bool {
    task.heap_mut().set_root(handle, value).is_some()
}
