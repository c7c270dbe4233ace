//! Dependency-ordered validator scheduling
//!
//! A [`ValidationContext`] collects validators with declared prerequisites
//! on each other, computes a cycle-free execution order with Kahn's
//! algorithm and runs the validators with conditional gating: a validator
//! only executes when every prerequisite's outcome matches the declared
//! expectation. Findings aggregate into an [`ErrorRegistry`].

mod registry;

pub use registry::{ErrorRegistry, Severity, ValidationError, ValidityLevel};

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Instant;

use crate::errors::{ModelError, Result};
use crate::handler::ModelHandler;
use crate::property::PropertyId;
use crate::{log_op_end, log_op_error, log_op_start};

// ===== Handles =====

/// Handle for one registered validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ValidatorId(u32);

impl ValidatorId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        ValidatorId(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

// ===== Validator =====

/// One unit of model validation
///
/// Receives the model through a read-only handler and reports findings
/// into the registry it is given.
pub trait Validator<M> {
    fn validate(&self, handler: &dyn ModelHandler<M>, registry: &mut ErrorRegistry);
}

impl<M, F> Validator<M> for F
where
    F: Fn(&dyn ModelHandler<M>, &mut ErrorRegistry),
{
    fn validate(&self, handler: &dyn ModelHandler<M>, registry: &mut ErrorRegistry) {
        self(handler, registry)
    }
}

/// A declared dependency on another validator's outcome
///
/// `expect_valid` is the outcome that lets the dependent run: `true` gates
/// on the prerequisite passing, `false` on it failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prerequisite {
    pub validator: ValidatorId,
    pub expect_valid: bool,
}

struct ValidatorNode<M> {
    validator: Box<dyn Validator<M>>,
    binding: PropertyId,
    prerequisites: Vec<Prerequisite>,
}

// ===== ValidationContext =====

/// Builder and runner for one dependency-ordered validation pass
///
/// Starts in a building state accepting registrations; the first
/// [`schedule`](ValidationContext::schedule) (explicit or implied by
/// [`validate`](ValidationContext::validate)) freezes the execution order,
/// which is then reused across repeated validations.
pub struct ValidationContext<M> {
    validators: BTreeMap<ValidatorId, ValidatorNode<M>>,
    next_validator: u32,
    order: Option<Vec<ValidatorId>>,
}

impl<M> Default for ValidationContext<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> ValidationContext<M> {
    pub fn new() -> Self {
        ValidationContext {
            validators: BTreeMap::new(),
            next_validator: 0,
            order: None,
        }
    }

    /// Number of registered validators
    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Whether the execution order has been frozen
    pub fn is_scheduled(&self) -> bool {
        self.order.is_some()
    }

    /// The frozen execution order, if scheduled
    pub fn order(&self) -> Option<&[ValidatorId]> {
        self.order.as_deref()
    }

    /// Register a validator written against the property scope `binding`
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::AlreadyScheduled`] once the order is frozen.
    pub fn add_validator(
        &mut self,
        validator: Box<dyn Validator<M>>,
        binding: PropertyId,
    ) -> Result<ValidatorId> {
        if self.order.is_some() {
            return Err(ModelError::AlreadyScheduled);
        }
        let id = ValidatorId::from_raw(self.next_validator);
        self.next_validator += 1;
        self.validators.insert(
            id,
            ValidatorNode {
                validator,
                binding,
                prerequisites: Vec::new(),
            },
        );
        Ok(id)
    }

    /// Declare that `dependent` runs only after `prerequisite`, gated on
    /// its outcome matching `expect_valid`
    ///
    /// Re-declaring the same edge overwrites the expectation.
    ///
    /// # Errors
    ///
    /// [`ModelError::LoopDetected`] on a self-prerequisite,
    /// [`ModelError::IllegalStructuring`] when the two validators are bound
    /// to different property scopes, and
    /// [`ModelError::AlreadyScheduled`] once the order is frozen.
    pub fn require(
        &mut self,
        dependent: ValidatorId,
        prerequisite: ValidatorId,
        expect_valid: bool,
    ) -> Result<()> {
        if self.order.is_some() {
            return Err(ModelError::AlreadyScheduled);
        }
        if dependent == prerequisite {
            return Err(ModelError::LoopDetected {
                validator: dependent.to_string(),
            });
        }
        let prerequisite_binding = self.node(prerequisite)?.binding;
        let dependent_binding = self.node(dependent)?.binding;
        if dependent_binding != prerequisite_binding {
            return Err(ModelError::IllegalStructuring {
                dependent: dependent.to_string(),
                prerequisite: prerequisite.to_string(),
            });
        }

        let edge = Prerequisite {
            validator: prerequisite,
            expect_valid,
        };
        let prerequisites = &mut self
            .validators
            .get_mut(&dependent)
            .ok_or(ModelError::UnknownValidator {
                validator: dependent.raw(),
            })?
            .prerequisites;
        match prerequisites
            .iter_mut()
            .find(|existing| existing.validator == prerequisite)
        {
            Some(existing) => existing.expect_valid = expect_valid,
            None => prerequisites.push(edge),
        }
        Ok(())
    }

    /// Freeze the execution order
    ///
    /// Kahn's algorithm over the prerequisite graph: the ready set is
    /// seeded with validators that have no prerequisites and always yields
    /// its lowest handle first. Idempotent once scheduled.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::LoopDetected`] when nothing can start or
    /// edges remain after the ready set runs dry.
    pub fn schedule(&mut self) -> Result<()> {
        if self.order.is_some() {
            return Ok(());
        }

        let mut pending: BTreeMap<ValidatorId, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<ValidatorId, Vec<ValidatorId>> = BTreeMap::new();
        for (id, node) in &self.validators {
            pending.insert(*id, node.prerequisites.len());
            for prerequisite in &node.prerequisites {
                dependents
                    .entry(prerequisite.validator)
                    .or_default()
                    .push(*id);
            }
        }

        let mut ready: BTreeSet<ValidatorId> = pending
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(id, _)| *id)
            .collect();
        if ready.is_empty() && !self.validators.is_empty() {
            return Err(self.loop_error(&pending));
        }

        let mut order = Vec::with_capacity(self.validators.len());
        while let Some(id) = ready.pop_first() {
            order.push(id);
            pending.remove(&id);
            for dependent in dependents.get(&id).into_iter().flatten() {
                if let Some(count) = pending.get_mut(dependent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.insert(*dependent);
                    }
                }
            }
        }
        if order.len() != self.validators.len() {
            return Err(self.loop_error(&pending));
        }

        self.order = Some(order);
        Ok(())
    }

    /// Run the validators in dependency order with conditional gating
    ///
    /// Schedules first if still building. A validator executes only when
    /// every prerequisite's outcome matches its expectation, where the
    /// outcome is "ran and produced no error-severity finding" (a skipped
    /// prerequisite therefore counts as not valid). Skipped validators
    /// contribute nothing.
    ///
    /// # Returns
    ///
    /// The aggregate level of everything in `registry` after the pass.
    pub fn validate(
        &mut self,
        handler: &dyn ModelHandler<M>,
        registry: &mut ErrorRegistry,
    ) -> Result<ValidityLevel> {
        let started = Instant::now();
        log_op_start!("validate", order_len = self.validators.len());

        if let Err(err) = self.schedule() {
            log_op_error!(
                "validate",
                err,
                duration_ms = started.elapsed().as_millis() as u64
            );
            return Err(err);
        }
        let order = match &self.order {
            Some(order) => order.clone(),
            None => Vec::new(),
        };

        let mut outcomes: BTreeMap<ValidatorId, bool> = BTreeMap::new();
        for id in order {
            let node = self.node(id)?;
            let gate = node.prerequisites.iter().all(|prerequisite| {
                let valid = outcomes
                    .get(&prerequisite.validator)
                    .copied()
                    .unwrap_or(false);
                valid == prerequisite.expect_valid
            });
            if !gate {
                continue;
            }
            let mut local = ErrorRegistry::new();
            node.validator.validate(handler, &mut local);
            outcomes.insert(id, local.level() != ValidityLevel::Error);
            registry.merge(&local);
        }

        let level = registry.level();
        log_op_end!(
            "validate",
            duration_ms = started.elapsed().as_millis() as u64,
            level = ?level
        );
        Ok(level)
    }

    fn node(&self, id: ValidatorId) -> Result<&ValidatorNode<M>> {
        self.validators
            .get(&id)
            .ok_or(ModelError::UnknownValidator { validator: id.raw() })
    }

    /// Lowest still-pending handle names the cycle deterministically
    fn loop_error(&self, pending: &BTreeMap<ValidatorId, usize>) -> ModelError {
        let culprit = pending
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(id, _)| *id)
            .next();
        ModelError::LoopDetected {
            validator: culprit.map(|id| id.to_string()).unwrap_or_default(),
        }
    }
}
