//! Ability dispatch and hit resolution
//!
//! Player skills go through `try_invoke_ability`; boss attacks arrive as
//! `BossCommand`s. Both end up in the same helpers: a single hit, an area
//! blast around a point, or a projectile that explodes on first contact.

use bevy::prelude::*;

use super::Simulation;
use crate::combat::abilities::{AbilityKind, InvokeError};
use crate::combat::combatant::{CombatantId, Faction};
use crate::combat::constants::{FORWARD_CONE_COS, TIMER_EPSILON};
use crate::combat::damage::{Attack, DamageKind, DamageResult, Hit};
use crate::combat::events::CombatEvent;
use crate::combat::projectiles::{Projectile, ProjectileId};
use crate::combat::spatial::TargetList;
use crate::combat::status::{StatusApplication, StatusEffectSpec};

/// What a successful invocation did.
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityUse {
    pub caster: CombatantId,
    pub index: usize,
    pub ability: String,
    pub kind: AbilityKind,
    /// Combatants resolved immediately (empty for projectiles and whiffs)
    pub targets: TargetList,
    pub projectile: Option<ProjectileId>,
}

/// One hit to resolve: what, how hard, and what rides along.
pub(crate) struct HitSpec<'a> {
    pub name: &'a str,
    pub base: f32,
    pub kind: DamageKind,
    pub knockback: bool,
    pub status_effects: &'a [StatusEffectSpec],
}

fn flat(v: Vec3) -> Vec3 {
    Vec3::new(v.x, 0.0, v.z)
}

impl Simulation {
    /// Invoke ability `index` of `caster`.
    ///
    /// Fails without mutating anything when the caster is missing, dead or
    /// incapacitated, the slot is invalid or empty, the ability is cooling
    /// down, or the caster cannot pay for it. On success the cooldown is
    /// stamped before any effect resolves.
    pub fn try_invoke_ability(
        &mut self,
        caster: CombatantId,
        index: usize,
        ally: Option<CombatantId>,
    ) -> Result<AbilityUse, InvokeError> {
        let now = self.now;
        let combatant = self
            .combatants
            .get_mut(&caster)
            .ok_or(InvokeError::UnknownCaster(caster))?;
        if combatant.is_dead() {
            return Err(InvokeError::CasterDead);
        }
        if !combatant.can_act() {
            return Err(InvokeError::Incapacitated);
        }
        let definition = combatant.abilities.check(index, now)?.clone();
        if let Some(pool) = combatant.resource {
            if definition.resource_cost > 0.0 && pool.current + TIMER_EPSILON < definition.resource_cost {
                return Err(InvokeError::InsufficientResource {
                    needed: definition.resource_cost,
                    available: pool.current,
                });
            }
        }

        combatant.abilities.stamp(index, now);
        combatant
            .try_spend_resource(definition.resource_cost)
            .map_err(|(needed, available)| InvokeError::InsufficientResource { needed, available })?;
        let origin = combatant.position;
        let facing = combatant.facing;
        let faction = combatant.faction;

        debug!("{} uses {} at {:.2}s", caster, definition.name, now);
        self.emit(CombatEvent::AbilityUsed {
            caster,
            index,
            ability: definition.name.clone(),
        });
        self.refresh_spatial();

        let spec = HitSpec {
            name: &definition.name,
            base: definition.amount,
            kind: definition.damage_kind,
            knockback: definition.knockback,
            status_effects: &definition.status_effects,
        };

        let mut used = AbilityUse {
            caster,
            index,
            ability: definition.name.clone(),
            kind: definition.kind,
            targets: TargetList::new(),
            projectile: None,
        };

        match definition.kind {
            AbilityKind::Melee | AbilityKind::Ranged => {
                if let Some(target) = self.forward_target(caster, origin, facing, definition.range) {
                    self.resolve_hit(caster, target, &spec, None);
                    used.targets.push(target);
                }
            }
            AbilityKind::Area => {
                used.targets = self.area_blast(caster, origin, definition.range, &spec);
            }
            AbilityKind::Projectile => {
                let projectile = Projectile::new(
                    self.next_projectile_id(),
                    caster,
                    faction,
                    definition.name.clone(),
                    origin,
                    facing * definition.projectile_speed,
                    definition.amount,
                    definition.damage_kind,
                    definition.radius,
                )
                .with_range(definition.range)
                .with_knockback(definition.knockback)
                .with_status_effects(definition.status_effects.clone());
                used.projectile = Some(projectile.id);
                self.projectiles.push(projectile);
            }
            AbilityKind::Heal => {
                let target = ally
                    .filter(|id| {
                        self.combatants
                            .get(id)
                            .map(|a| a.is_alive() && a.faction == faction)
                            .unwrap_or(false)
                    })
                    .unwrap_or(caster);
                self.resolve_hit(caster, target, &spec, None);
                used.targets.push(target);
            }
        }

        self.process_deaths();
        Ok(used)
    }

    /// Invoke an ability, reporting only success. Failures are logged.
    pub fn invoke_ability(&mut self, caster: CombatantId, index: usize) -> bool {
        match self.try_invoke_ability(caster, index, None) {
            Ok(_) => true,
            Err(e @ (InvokeError::InvalidIndex { .. } | InvokeError::UnknownCaster(_))) => {
                warn!("{} cannot invoke ability {}: {}", caster, index, e);
                false
            }
            Err(e) => {
                debug!("{} cannot invoke ability {}: {}", caster, index, e);
                false
            }
        }
    }

    /// Nearest hostile inside `range` within the forward cone and in sight.
    fn forward_target(&self, caster: CombatantId, origin: Vec3, facing: Vec3, range: f32) -> Option<CombatantId> {
        let faction = self.combatants.get(&caster)?.faction;
        let facing = flat(facing).normalize_or_zero();
        self.spatial
            .query_radius(origin, range, Some(faction.opponent()))
            .into_iter()
            .find(|id| {
                let Some(target) = self.combatants.get(id) else {
                    return false;
                };
                let offset = flat(target.position - origin);
                let in_cone = match offset.try_normalize() {
                    Some(dir) => dir.dot(facing) >= FORWARD_CONE_COS,
                    None => true,
                };
                in_cone && self.line_of_sight(caster, origin, target.position)
            })
    }

    /// No obstacle between `from` and `to`. Bodies do not block sight.
    pub(crate) fn line_of_sight(&self, viewer: CombatantId, from: Vec3, to: Vec3) -> bool {
        let offset = to - from;
        let distance = offset.length();
        if distance <= f32::EPSILON {
            return true;
        }
        match self.spatial.raycast(from, offset, distance, Some(viewer)) {
            Some(hit) => hit.combatant().is_some(),
            None => true,
        }
    }

    /// Resolve one hit from `source` against `target` and report it.
    pub(crate) fn resolve_hit(
        &mut self,
        source: CombatantId,
        target: CombatantId,
        spec: &HitSpec,
        impact_point: Option<Vec3>,
    ) -> Option<DamageResult> {
        let origin = self.combatants.get(&source).map(|c| c.position);
        let resolver = self.resolver;
        let Some(victim) = self.combatants.get_mut(&target) else {
            warn!("{} hit unknown target {}", source, target);
            return None;
        };

        let point = impact_point.or(origin).unwrap_or(victim.position);
        let direction = flat(victim.position - point)
            .try_normalize()
            .or_else(|| origin.and_then(|o| flat(victim.position - o).try_normalize()))
            .unwrap_or(Vec3::ZERO);
        let attack = Attack::new(Some(source), spec.name)
            .with_knockback(spec.knockback)
            .with_status_effects(spec.status_effects);
        let hit = Hit {
            base: spec.base,
            kind: spec.kind,
            impact_point: impact_point.unwrap_or(victim.position),
            impact_direction: direction,
        };
        let result = resolver.resolve(&attack, victim, hit, self.rng.as_mut());

        if !spec.kind.is_heal() && result.applied > 0.0 {
            if let Some(attacker) = self.combatants.get_mut(&source) {
                attacker.damage_dealt += result.applied;
            }
        }

        self.emit(CombatEvent::Hit(result.clone()));
        if spec.kind.is_heal() && result.applied > 0.0 {
            self.emit(CombatEvent::Healed {
                target,
                source: Some(source),
                amount: result.applied,
            });
        }
        for (status, application) in &result.statuses {
            self.emit(CombatEvent::StatusApplied {
                target,
                status: *status,
                source: Some(source),
                refreshed: *application == StatusApplication::Refreshed,
            });
        }
        Some(result)
    }

    /// Hit every hostile of `source` within `radius` of `center`.
    pub(crate) fn area_blast(&mut self, source: CombatantId, center: Vec3, radius: f32, spec: &HitSpec) -> TargetList {
        let Some(faction) = self.combatants.get(&source).map(|c| c.faction) else {
            return TargetList::new();
        };
        let targets = self.spatial.query_radius(center, radius, Some(faction.opponent()));
        for target in targets.iter() {
            self.resolve_hit(source, *target, spec, Some(center));
        }
        targets
    }

    pub(crate) fn next_projectile_id(&mut self) -> ProjectileId {
        let id = ProjectileId(self.next_projectile);
        self.next_projectile += 1;
        id
    }

    /// Launch a boss projectile.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn launch(
        &mut self,
        owner: CombatantId,
        faction: Faction,
        name: &str,
        origin: Vec3,
        velocity: Vec3,
        damage: f32,
        explosion_radius: f32,
        ballistic: bool,
    ) -> ProjectileId {
        let mut projectile = Projectile::new(
            self.next_projectile_id(),
            owner,
            faction,
            name,
            origin,
            velocity,
            damage,
            DamageKind::Physical,
            explosion_radius,
        );
        if ballistic {
            projectile = projectile.ballistic();
        }
        let id = projectile.id;
        self.projectiles.push(projectile);
        id
    }

    /// Move projectiles and explode the ones that touched something.
    pub(crate) fn update_projectiles(&mut self, dt: f32) {
        if self.projectiles.is_empty() {
            return;
        }
        self.refresh_spatial();

        let mut projectiles = std::mem::take(&mut self.projectiles);
        for projectile in projectiles.iter_mut() {
            let Some(contact) = projectile.advance(dt, self.spatial.as_ref()) else {
                continue;
            };
            if projectile.explode() {
                debug!("{} from {} exploded on {:?}", projectile.name, projectile.owner, contact);
                self.explode(projectile);
            }
        }
        projectiles.retain(|p| !p.is_spent());

        // Anything launched while resolving explosions goes after the survivors.
        projectiles.append(&mut self.projectiles);
        self.projectiles = projectiles;
    }

    fn explode(&mut self, projectile: &Projectile) {
        if !self.combatants.contains_key(&projectile.owner) {
            return;
        }
        let spec = HitSpec {
            name: &projectile.name,
            base: projectile.damage,
            kind: projectile.kind,
            knockback: projectile.knockback,
            status_effects: &projectile.status_effects,
        };
        let targets = self.area_blast(projectile.owner, projectile.position, projectile.explosion_radius, &spec);
        self.emit(CombatEvent::ProjectileExploded {
            projectile: projectile.id,
            owner: projectile.owner,
            position: projectile.position,
            targets: targets.len(),
        });
    }
}
