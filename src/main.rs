use automation::Planner;
use battle::arena::Arena;
use battle::commander::{Commander, CommanderKind};
use battle::planner::BattlePlanner;
use battle::unit::BattleUnit;
use map::object::{MapObject, MapObjectKind, ObjectPayload};
use map::tile::{Ground, Tile};
use map::world::World;
use ravenmoor_core::artifact::Artifact;
use ravenmoor_core::castle::{building, Castle, CastleId};
use ravenmoor_core::color::PlayerColor;
use ravenmoor_core::difficulty::Difficulty;
use ravenmoor_core::hero::{Hero, HeroId};
use ravenmoor_core::kingdom::{Control, Kingdom};
use ravenmoor_core::monster::MonsterId;
use ravenmoor_core::resource::{Funds, ResourceKind};
use ravenmoor_core::spell::Spell;
use ravenmoor_core::troop::Troop;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Builds a small demonstration world: two kingdoms, one castle each, a few
/// objects scattered between them.
fn build_demo_world() -> World {
    let width = 24;
    let height = 16;
    let tiles = (0..width * height).map(|index| Tile::new(index, Ground::Grass)).collect();
    let mut world = World::new(width, height, tiles, 0x5eed);

    world.kingdoms.push(Kingdom::new(PlayerColor::Blue, Control::Ai));
    world.kingdoms.push(Kingdom::new(PlayerColor::Red, Control::Ai));

    let mut home = Castle::new(CastleId(0), "Greyford", PlayerColor::Blue, world.index(2, 8));
    home.build(building::CASTLE);
    home.build(building::MAGE_GUILD_1);
    home.available_troops = vec![Troop::new(MonsterId::Swordsman, 12), Troop::new(MonsterId::Archer, 18)];
    let home_position = home.position;
    world.castles.push(home);
    world.kingdom_mut(PlayerColor::Blue).unwrap().castles.push(CastleId(0));

    let mut rival = Castle::new(CastleId(1), "Ravenmoor", PlayerColor::Red, world.index(21, 8));
    rival.build(building::CASTLE);
    rival.garrison.join_troop(MonsterId::Pikeman, 20);
    world.castles.push(rival);
    world.kingdom_mut(PlayerColor::Red).unwrap().castles.push(CastleId(1));

    let mut hero = Hero::new(HeroId(0), "Mira", PlayerColor::Blue, home_position);
    hero.army.join_troop(MonsterId::Swordsman, 20);
    hero.army.join_troop(MonsterId::Ranger, 12);
    hero.bag.push(Artifact::MagicBook);
    hero.learn_spell(Spell::LightningBolt);
    hero.learn_spell(Spell::Haste);
    world.heroes.push(hero);
    world.kingdom_mut(PlayerColor::Blue).unwrap().heroes.push(HeroId(0));
    world.relocate_hero(HeroId(0), home_position);

    let chest_position = world.index(8, 8);
    world.tile_mut(chest_position).object = Some(MapObject::new(MapObjectKind::TreasureChest));

    let mine_position = world.index(12, 6);
    world.tile_mut(mine_position).object = Some(MapObject::with_payload(
        MapObjectKind::Mine,
        ObjectPayload::Income(Funds::from_resource(ResourceKind::Ore, 2)),
    ));

    let monster_position = world.index(15, 10);
    world.tile_mut(monster_position).object = Some(MapObject::with_payload(
        MapObjectKind::Monster,
        ObjectPayload::Troops(Troop::new(MonsterId::Goblin, 15)),
    ));

    world
}

/// Sets up a small open-field battle and lets the planner drive both sides
/// for a few unit turns.
fn run_demo_battle() {
    let mut arena = Arena::new(PlayerColor::Blue, PlayerColor::Red);

    let mut caster = Commander::new(CommanderKind::Hero, PlayerColor::Blue);
    caster.bag.push(Artifact::MagicBook);
    caster.power = 4;
    caster.spells = vec![Spell::LightningBolt, Spell::Haste, Spell::Slow];
    arena.add_commander(caster);
    arena.add_commander(Commander::new(CommanderKind::Hero, PlayerColor::Red));

    arena.units.push(BattleUnit::new(1, MonsterId::Swordsman, 20, PlayerColor::Blue, 22, false));
    arena.units.push(BattleUnit::new(2, MonsterId::Ranger, 12, PlayerColor::Blue, 0, false));
    arena.units.push(BattleUnit::new(3, MonsterId::Pikeman, 25, PlayerColor::Red, 32, true));
    arena.units.push(BattleUnit::new(4, MonsterId::Orc, 10, PlayerColor::Red, 10, true));

    let mut planner = BattlePlanner::new(Difficulty::Normal);
    planner.battle_begins();

    for (turn, unit) in [(1, 1), (1, 2), (2, 1), (2, 2)] {
        arena.set_turn_number(turn);
        let actions = planner.battle_turn(&mut arena, unit);
        for action in &actions {
            info!(?action, unit, "battle command");
        }
        if let Some(commander) = arena.commander_mut(PlayerColor::Blue) {
            // One spell per round; the demo does not resolve casts.
            commander.spell_cast_this_round =
                actions.iter().any(|action| matches!(action, battle::command::Command::Cast { .. }));
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("ravenmoor decision core demo");

    let mut world = build_demo_world();
    let mut planner = Planner::new(Difficulty::Normal);

    for day in 1..=3 {
        info!(day, "kingdom turn");
        let commands = planner.kingdom_turn(&mut world, PlayerColor::Blue);
        for command in &commands {
            info!(?command, "adventure command");
        }

        // Restore the daily movement allowance.
        for hero in &mut world.heroes {
            let max_move = hero.max_move_points();
            hero.move_points = max_move;
            let restored = hero.daily_restored_spell_points();
            hero.spell_points = (hero.spell_points + restored).min(hero.max_spell_points() * 2);
        }
        world.next_day();
    }

    run_demo_battle();
}
