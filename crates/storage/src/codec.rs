// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversions between the value objects in `taskd_core` and the
//! [`crate::metafile::MetaFile`] lines that represent them on disk.

use taskd_core::job::JobRecord;
use taskd_core::recovery::RecoveryRecord;
use taskd_core::task::TaskSnapshot;
use taskd_core::task_resource::{LockType, TaskResource};
use taskd_core::task_result::TaskResult;
use taskd_core::{
    ParamList, TaskCleanPolicy, TaskId, TaskPersistPolicy, TaskPriority, TaskRecoveryPolicy,
};

use crate::error::StorageError;
use crate::metafile::MetaFile;

pub fn task_snapshot_to_metafile(snapshot: &TaskSnapshot) -> MetaFile {
    let mut meta = MetaFile::new();
    meta.set("id", &snapshot.id);
    meta.set("name", &snapshot.name);
    meta.set("tag", &snapshot.tag);
    meta.set("priority", snapshot.priority);
    meta.set("persistPolicy", snapshot.persist_policy);
    meta.set("cleanPolicy", snapshot.clean_policy);
    meta.set("recoveryPolicy", snapshot.recovery_policy);
    meta.set("state", snapshot.state);
    meta.set("njobs", snapshot.njobs);
    meta.set("nrecoveries", snapshot.nrecoveries);
    meta.set("metadataVersion", snapshot.metadata_version);
    meta
}

/// Everything a `<id>.task` metafile carries, before jobs/recoveries/result
/// have been merged in (those are separate files, read by the caller).
pub struct TaskFields {
    pub id: TaskId,
    pub name: String,
    pub tag: String,
    pub priority: TaskPriority,
    pub persist_policy: TaskPersistPolicy,
    pub clean_policy: TaskCleanPolicy,
    pub recovery_policy: TaskRecoveryPolicy,
    pub state: taskd_core::State,
    pub njobs: usize,
    pub nrecoveries: usize,
    pub metadata_version: u32,
}

pub fn metafile_to_task_fields(meta: &MetaFile) -> Result<TaskFields, StorageError> {
    Ok(TaskFields {
        id: TaskId::new(meta.get_required::<String>("id")?),
        name: meta.get_required("name")?,
        tag: meta.get_required("tag")?,
        priority: meta.get_required("priority")?,
        persist_policy: meta.get_required("persistPolicy")?,
        clean_policy: meta.get_required("cleanPolicy")?,
        recovery_policy: meta.get_required("recoveryPolicy")?,
        state: meta.get_required("state")?,
        njobs: meta.get_required("njobs")?,
        nrecoveries: meta.get_required("nrecoveries")?,
        metadata_version: meta.get_required("metadataVersion")?,
    })
}

pub fn job_record_to_metafile(job: &JobRecord) -> MetaFile {
    let mut meta = MetaFile::new();
    meta.set("name", &job.name);
    meta.set("runcmd", &job.runcmd);
    meta
}

pub fn metafile_to_job_record(meta: &MetaFile) -> Result<JobRecord, StorageError> {
    Ok(JobRecord {
        name: meta.get_required("name")?,
        runcmd: meta.get_required("runcmd")?,
    })
}

pub fn recovery_record_to_metafile(recovery: &RecoveryRecord) -> MetaFile {
    let mut meta = MetaFile::new();
    meta.set("name", &recovery.name);
    meta.set("moduleName", &recovery.module_name);
    meta.set("object", &recovery.object);
    meta.set("function", &recovery.function);
    meta.set("params", &recovery.params);
    meta
}

pub fn metafile_to_recovery_record(meta: &MetaFile) -> Result<RecoveryRecord, StorageError> {
    let params_line: String = meta.get("params").unwrap_or("").to_string();
    Ok(RecoveryRecord {
        name: meta.get_required("name")?,
        module_name: meta.get_required("moduleName")?,
        object: meta.get_required("object")?,
        function: meta.get_required("function")?,
        params: ParamList::parse(&params_line),
    })
}

pub fn task_result_to_metafile(result: &TaskResult) -> MetaFile {
    let mut meta = MetaFile::new();
    meta.set("code", result.code);
    meta.set("message", &result.message);
    meta.set("result", &result.result);
    meta
}

pub fn metafile_to_task_result(meta: &MetaFile) -> Result<TaskResult, StorageError> {
    Ok(TaskResult {
        code: meta.get_required("code")?,
        message: meta.get_required("message")?,
        result: meta.get_required("result")?,
    })
}

pub fn task_resource_to_metafile(resource: &TaskResource) -> MetaFile {
    let mut meta = MetaFile::new();
    meta.set("namespace", &resource.namespace);
    meta.set("name", &resource.name);
    meta.set("lockType", resource.lock_type);
    meta
}

pub fn metafile_to_task_resource(meta: &MetaFile) -> Result<TaskResource, StorageError> {
    Ok(TaskResource {
        namespace: meta.get_required("namespace")?,
        name: meta.get_required("name")?,
        lock_type: meta.get_required::<LockType>("lockType")?,
    })
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
