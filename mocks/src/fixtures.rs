//! Builders for constructing a full `Task` -> `Stage` -> `Work` ->
//! `ExecutableTask` -> `Subtask` hierarchy directly, bypassing the planning
//! pipeline, for tests that exercise the execution engine or HTTP layer in
//! isolation.

use orchestrator_core::ids;
use orchestrator_core::models::{
    ExecutableTask, ExecutorType, Stage, Subtask, SubtaskStatus, Task, Work,
};

/// A brand-new task, not yet through any planning phase.
pub fn new_task(id: &str) -> Task {
    Task::new(id.to_string(), id.to_string(), format!("build {id}"))
}

fn empty_stage(index: usize, name: &str) -> Stage {
    Stage {
        id: ids::stage_id(index),
        name: name.to_string(),
        description: format!("{name} description"),
        result: vec!["result".to_string()],
        what_should_be_delivered: Vec::new(),
        checkpoints: Vec::new(),
        work_packages: Vec::new(),
        status: SubtaskStatus::Pending,
        error_message: None,
        started_at: None,
        completed_at: None,
    }
}

fn empty_work(stage_id: &str, index: usize, name: &str) -> Work {
    Work {
        id: ids::work_id(stage_id, index),
        stage_id: stage_id.to_string(),
        name: name.to_string(),
        description: format!("{name} description"),
        required_inputs: Vec::new(),
        expected_outcome: "outcome".to_string(),
        generated_artifacts: Vec::new(),
        validation_criteria: Vec::new(),
        sequence_order: index as u32,
        dependencies: Vec::new(),
        tasks: Vec::new(),
        status: SubtaskStatus::Pending,
        error_message: None,
        started_at: None,
        completed_at: None,
    }
}

fn empty_executable_task(work_id: &str, index: usize, name: &str) -> ExecutableTask {
    ExecutableTask {
        id: ids::executable_task_id(work_id, index),
        work_id: work_id.to_string(),
        name: name.to_string(),
        description: format!("{name} description"),
        required_inputs: Vec::new(),
        generated_artifacts: Vec::new(),
        validation_criteria: Vec::new(),
        sequence_order: index as u32,
        dependencies: Vec::new(),
        subtasks: Vec::new(),
        status: SubtaskStatus::Pending,
        error_message: None,
        started_at: None,
        completed_at: None,
    }
}

/// A pending subtask with `validation_criteria`, ready to hand to the
/// execution engine.
pub fn subtask(
    executable_task_id: &str,
    index: usize,
    name: &str,
    description: &str,
    validation_criteria: Vec<String>,
) -> Subtask {
    let mut st = Subtask::new(
        ids::subtask_id(executable_task_id, index),
        executable_task_id.to_string(),
        name.to_string(),
        description.to_string(),
        ExecutorType::AiAgent,
        index as u32,
    );
    st.validation_criteria = validation_criteria;
    st
}

/// A full `Task` with exactly one stage, one work package, one executable
/// task, and the given subtasks attached beneath it — the minimal tree the
/// execution engine and HTTP subtask-status endpoints operate on.
pub fn task_with_subtasks(task_id: &str, subtasks: Vec<Subtask>) -> Task {
    let mut task = new_task(task_id);
    let mut stage = empty_stage(0, "only stage");
    let mut work = empty_work(&stage.id, 0, "only work");
    let mut exec_task = empty_executable_task(&work.id, 0, "only executable task");
    exec_task.subtasks = subtasks;
    work.tasks.push(exec_task);
    stage.work_packages.push(work);
    task.network_plan.stages.push(stage);
    task
}

/// Convenience: a task with a single subtask, the common case for execution
/// engine unit tests.
pub fn task_with_subtask(task_id: &str, description: &str, validation_criteria: Vec<String>) -> Task {
    let st = subtask("S1_W1_ET1", 0, "the subtask", description, validation_criteria);
    task_with_subtasks(task_id, vec![st])
}
